//! Heuristic endpoint discovery.
//!
//! Users type a bare host (`192.168.1.5`), a host:port, or a full URL; the
//! real API endpoint hides behind a backend-specific protocol, port and
//! path. Candidate generation is a pure function of the input; probing is
//! parameterized by a backend-specific check so this module never touches
//! the network itself.

use std::collections::HashSet;
use std::future::Future;

use futures_util::future::join_all;
use url::Url;

use crate::downloader::models::DownloaderType;

/// Backend-specific discovery constants.
#[derive(Debug, Clone, Copy)]
pub struct HostProfile {
    pub default_ports: &'static [u16],
    /// Known API path suffixes, in probe-preference order. The empty path
    /// covers reverse-proxy setups that rewrite it away.
    pub api_paths: &'static [&'static str],
}

impl DownloaderType {
    pub fn host_profile(&self) -> HostProfile {
        match self {
            Self::Sabnzbd => HostProfile {
                default_ports: &[8080, 9090],
                api_paths: &["", "api", "sabnzbd", "sabnzbd/api"],
            },
            Self::Nzbget => HostProfile {
                default_ports: &[6789],
                api_paths: &["", "jsonrpc"],
            },
        }
    }
}

/// Expands a possibly-partial host string into the full candidate list:
/// the Cartesian product of {path} × {port} × {protocol}.
///
/// - No `scheme://` prefix: both `http` and `https` become candidates.
/// - Explicit port: only that port; otherwise the backend's default ports,
///   plus a port-less candidate when the input carries a path (the user
///   may have entered a reverse-proxied address without a port).
/// - A path that already equals one of the backend's known suffixes is
///   stripped before recombination so it is not duplicated.
///
/// Pure and deterministic; order determines probe order only. Unparseable
/// input yields an empty list.
pub fn generate_api_url_suggestions(input: &str, profile: &HostProfile) -> Vec<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let has_scheme = trimmed.contains("://");
    let parse_target = if has_scheme {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    let parsed = match Url::parse(&parse_target) {
        Ok(url) => url,
        Err(e) => {
            log::debug!("Unparseable host input '{}': {}", input, e);
            return Vec::new();
        }
    };
    let host = match parsed.host_str() {
        Some(h) => h.to_string(),
        None => return Vec::new(),
    };

    let schemes: Vec<String> = if has_scheme {
        vec![parsed.scheme().to_string()]
    } else {
        vec!["http".to_string(), "https".to_string()]
    };

    let base_path = parsed.path().trim_matches('/').to_string();
    // Already one of the known suffixes: strip so recombination doesn't
    // produce e.g. "sabnzbd/api/sabnzbd/api".
    let base_path = if profile.api_paths.contains(&base_path.as_str()) {
        String::new()
    } else {
        base_path
    };

    let ports: Vec<Option<u16>> = match parsed.port() {
        Some(port) => vec![Some(port)],
        None => {
            let mut ports: Vec<Option<u16>> =
                profile.default_ports.iter().copied().map(Some).collect();
            if !base_path.is_empty() {
                ports.push(None);
            }
            ports
        }
    };

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for api_path in profile.api_paths {
        for port in &ports {
            for scheme in &schemes {
                let mut segments: Vec<&str> = Vec::new();
                if !base_path.is_empty() {
                    segments.push(base_path.as_str());
                }
                if !api_path.is_empty() {
                    segments.push(api_path);
                }
                let path = segments.join("/");
                let authority = match port {
                    Some(p) => format!("{}:{}", host, p),
                    None => host.clone(),
                };
                let url = if path.is_empty() {
                    format!("{}://{}", scheme, authority)
                } else {
                    format!("{}://{}/{}", scheme, authority, path)
                };
                if seen.insert(url.clone()) {
                    candidates.push(url);
                }
            }
        }
    }
    candidates
}

/// Probes candidates sequentially and returns the first that validates.
///
/// Sequential on purpose: early exit, and no burst of speculative
/// connections to possibly-nonexistent hosts. Returns `None` when every
/// probe fails — a discovery miss is not an error.
pub async fn find_api_url<F, Fut>(candidates: Vec<String>, probe: F) -> Option<String>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = bool>,
{
    for candidate in candidates {
        if probe(candidate.clone()).await {
            log::debug!("Endpoint discovery matched {}", candidate);
            return Some(candidate);
        }
    }
    None
}

/// Probes all candidates concurrently and returns every URL that
/// validated, in candidate order. Used when the caller wants to present
/// multiple valid options rather than auto-pick one.
pub async fn find_all_api_urls<F, Fut>(candidates: Vec<String>, probe: F) -> Vec<String>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = bool>,
{
    let checks = candidates.into_iter().map(|candidate| {
        let fut = probe(candidate.clone());
        async move {
            if fut.await {
                Some(candidate)
            } else {
                None
            }
        }
    });
    join_all(checks).await.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sab() -> HostProfile {
        DownloaderType::Sabnzbd.host_profile()
    }

    fn nzbget() -> HostProfile {
        DownloaderType::Nzbget.host_profile()
    }

    #[test]
    fn test_bare_host_covers_schemes_and_default_ports() {
        let candidates = generate_api_url_suggestions("192.168.1.5", &sab());
        assert!(candidates.contains(&"http://192.168.1.5:8080".to_string()));
        assert!(candidates.contains(&"https://192.168.1.5:8080".to_string()));
        assert!(candidates.contains(&"http://192.168.1.5:9090".to_string()));
        assert!(candidates.contains(&"http://192.168.1.5:8080/sabnzbd/api".to_string()));
        // no explicit port and no path: no port-less candidates
        assert!(!candidates.iter().any(|c| !c.contains(":8080") && !c.contains(":9090")));
    }

    #[test]
    fn test_explicit_scheme_is_sole_candidate() {
        let candidates = generate_api_url_suggestions("https://nzb.example.com", &nzbget());
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.starts_with("https://")));
    }

    #[test]
    fn test_explicit_port_is_sole_candidate() {
        let candidates = generate_api_url_suggestions("192.168.1.5:7777", &sab());
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.contains(":7777")));
    }

    #[test]
    fn test_path_input_adds_portless_candidates() {
        let candidates = generate_api_url_suggestions("media.example.com/downloads", &sab());
        assert!(candidates.contains(&"http://media.example.com/downloads/api".to_string()));
        assert!(candidates.contains(&"https://media.example.com/downloads".to_string()));
        assert!(candidates.contains(&"http://media.example.com:8080/downloads/api".to_string()));
    }

    #[test]
    fn test_known_suffix_is_stripped_before_recombination() {
        let candidates = generate_api_url_suggestions("192.168.1.5:8080/sabnzbd/api", &sab());
        assert!(candidates.contains(&"http://192.168.1.5:8080/sabnzbd/api".to_string()));
        assert!(!candidates.iter().any(|c| c.contains("sabnzbd/api/sabnzbd")));

        let candidates = generate_api_url_suggestions("192.168.1.5:6789/jsonrpc", &nzbget());
        assert!(candidates.contains(&"http://192.168.1.5:6789/jsonrpc".to_string()));
        assert!(!candidates.iter().any(|c| c.contains("jsonrpc/jsonrpc")));
    }

    #[test]
    fn test_idempotent_and_duplicate_free() {
        let a = generate_api_url_suggestions("192.168.1.5", &sab());
        let b = generate_api_url_suggestions("192.168.1.5", &sab());
        assert_eq!(a, b);

        let unique: HashSet<_> = a.iter().collect();
        assert_eq!(unique.len(), a.len());
    }

    #[test]
    fn test_garbage_input_yields_empty() {
        assert!(generate_api_url_suggestions("", &sab()).is_empty());
        assert!(generate_api_url_suggestions("   ", &sab()).is_empty());
        assert!(generate_api_url_suggestions("http://", &sab()).is_empty());
    }

    #[tokio::test]
    async fn test_find_api_url_short_circuits() {
        let candidates = vec![
            "http://a".to_string(),
            "http://b".to_string(),
            "http://c".to_string(),
        ];
        let probed = Arc::new(AtomicUsize::new(0));
        let probed_ref = probed.clone();

        let found = find_api_url(candidates, move |url| {
            let probed = probed_ref.clone();
            async move {
                probed.fetch_add(1, Ordering::SeqCst);
                url == "http://b"
            }
        })
        .await;

        assert_eq!(found, Some("http://b".to_string()));
        // must not probe candidates after the first success
        assert_eq!(probed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_find_api_url_none_on_total_miss() {
        let candidates = vec!["http://a".to_string(), "http://b".to_string()];
        let found = find_api_url(candidates, |_| async { false }).await;
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_find_all_api_urls_returns_every_success() {
        let candidates = vec![
            "http://a".to_string(),
            "http://b".to_string(),
            "http://c".to_string(),
        ];
        let found = find_all_api_urls(candidates, |url| async move { url != "http://b" }).await;
        assert_eq!(found, vec!["http://a".to_string(), "http://c".to_string()]);
    }
}
