//! CONNECT tunnel establishment and relay
//!
//! A CONNECT request opens a raw TCP connection to the requested authority,
//! confirms the tunnel with a 200 response, then splices bytes both ways
//! until either side closes. No byte is ever inspected once the tunnel is
//! established; TLS or anything else passes through untouched.

use crate::error::{Error, Result};
use crate::utils::http::build_error_response;
use crate::{log_debug, log_error, log_warning};
use hyper::upgrade::Upgraded;
use hyper::{Body, Request, Response, StatusCode};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

/// Split a CONNECT authority into host and port
///
/// The port defaults to 443 when absent, the usual forward-proxy
/// convention. Bracketed IPv6 literals are accepted; the brackets are not
/// part of the returned host.
pub fn parse_connect_authority(authority: &str) -> Result<(String, u16)> {
    let authority = authority.trim();

    if let Some(rest) = authority.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(|| {
            Error::InvalidTarget(format!("unterminated IPv6 literal: {}", authority))
        })?;
        if host.is_empty() {
            return Err(Error::InvalidTarget(format!(
                "empty host in CONNECT target: {}",
                authority
            )));
        }
        let port = match tail {
            "" => 443,
            tail => tail
                .strip_prefix(':')
                .and_then(|p| p.parse().ok())
                .ok_or_else(|| {
                    Error::InvalidTarget(format!("invalid port in CONNECT target: {}", authority))
                })?,
        };
        return Ok((host.to_string(), port));
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => {
            if host.is_empty() {
                return Err(Error::InvalidTarget(format!(
                    "empty host in CONNECT target: {}",
                    authority
                )));
            }
            let port = port.parse::<u16>().map_err(|_| {
                Error::InvalidTarget(format!("invalid port in CONNECT target: {}", authority))
            })?;
            Ok((host.to_string(), port))
        }
        None => {
            if authority.is_empty() {
                Err(Error::InvalidTarget("empty CONNECT target".to_string()))
            } else {
                Ok((authority.to_string(), 443))
            }
        }
    }
}

/// Handle a CONNECT request end to end
///
/// Connects to the target first; the 200 confirmation is only sent once the
/// upstream socket is open. On success the relay runs in a spawned task over
/// the upgraded connection while the 200 travels back to the client.
pub async fn establish(req: Request<Body>, connect_timeout: Duration) -> Response<Body> {
    let authority = match req.uri().authority() {
        Some(authority) => authority.to_string(),
        None => req.uri().to_string(),
    };

    let (host, port) = match parse_connect_authority(&authority) {
        Ok(target) => target,
        Err(e) => {
            log_error!("Rejecting CONNECT {}: {}", authority, e);
            return build_error_response(StatusCode::BAD_REQUEST, "Invalid CONNECT target");
        }
    };

    let connect_start = Instant::now();
    let upstream =
        match tokio::time::timeout(connect_timeout, TcpStream::connect((host.as_str(), port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                let err = Error::TunnelConnect(format!("{}:{}: {}", host, port, e));
                log_error!("{}", err);
                return build_error_response(
                    StatusCode::BAD_GATEWAY,
                    &format!("Proxy error: {}", err),
                );
            }
            Err(_) => {
                let err = Error::TunnelConnect(format!(
                    "{}:{}: connect timed out after {}s",
                    host,
                    port,
                    connect_timeout.as_secs()
                ));
                log_error!("{}", err);
                return build_error_response(
                    StatusCode::BAD_GATEWAY,
                    &format!("Proxy error: {}", err),
                );
            }
        };

    log_debug!(
        "Tunnel to {}:{} open ({}ms), awaiting upgrade",
        host,
        port,
        connect_start.elapsed().as_millis()
    );

    tokio::spawn(async move {
        match hyper::upgrade::on(req).await {
            Ok(upgraded) => {
                if let Err(e) = relay(upgraded, upstream, &host, port).await {
                    log_warning!("{}", e);
                }
            }
            Err(e) => {
                log_error!("Connection upgrade failed for {}:{}: {}", host, port, e);
            }
        }
    });

    // hyper writes the 200 status line; from the client's view the
    // connection then becomes an opaque byte pipe
    Response::new(Body::empty())
}

/// Splice bytes between the upgraded client connection and the upstream
/// socket until either side reaches EOF or errors; both legs are closed on
/// the way out in every case.
async fn relay(mut upgraded: Upgraded, mut upstream: TcpStream, host: &str, port: u16) -> Result<()> {
    match tokio::io::copy_bidirectional(&mut upgraded, &mut upstream).await {
        Ok((from_client, from_upstream)) => {
            log_debug!(
                "Tunnel {}:{} closed ({} bytes up, {} bytes down)",
                host,
                port,
                from_client,
                from_upstream
            );
            Ok(())
        }
        Err(e) => Err(Error::Relay(format!("{}:{}: {}", host, port, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_and_port_are_split() {
        assert_eq!(
            parse_connect_authority("example.com:8443").unwrap(),
            ("example.com".to_string(), 8443)
        );
    }

    #[test]
    fn missing_port_defaults_to_443() {
        assert_eq!(
            parse_connect_authority("example.com").unwrap(),
            ("example.com".to_string(), 443)
        );
    }

    #[test]
    fn ipv6_literals_are_accepted() {
        assert_eq!(
            parse_connect_authority("[2001:db8::1]:8443").unwrap(),
            ("2001:db8::1".to_string(), 8443)
        );
        assert_eq!(
            parse_connect_authority("[::1]").unwrap(),
            ("::1".to_string(), 443)
        );
    }

    #[test]
    fn malformed_targets_are_rejected() {
        assert!(parse_connect_authority("").is_err());
        assert!(parse_connect_authority(":443").is_err());
        assert!(parse_connect_authority("example.com:not-a-port").is_err());
        assert!(parse_connect_authority("[::1").is_err());
        assert!(parse_connect_authority("[]:443").is_err());
    }
}
