//! Bridge discovery via SSDP multicast.

use std::net::Ipv4Addr;
use std::sync::LazyLock;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use log::{debug, info};
use regex::Regex;

use crate::errors::Error;
use crate::runtime::{self, AsyncUdpSocket, Instant, UdpSocket};

type Result<T> = std::result::Result<T, Error>;

pub const SSDP_ADDR: &str = "239.255.255.250:1900";

const M_SEARCH: &str = "M-SEARCH * HTTP/1.1\r\n\
    HOST: 239.255.255.250:1900\r\n\
    MAN: \"ssdp:discover\"\r\n\
    MX: 1\r\n\
    ST: ssdp:all\r\n\r\n";

/// Description documents are fetched over plain HTTP on this port only.
const DESCRIPTION_PORT: u16 = 80;

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?i:location):\s*http://(\d+\.\d+\.\d+\.\d+):(\d+)(/[\w./-]+)")
        .expect("valid LOCATION pattern")
});

static MODEL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<modelName>\s*([^<]*?)\s*</modelName>")
        .expect("valid modelName pattern")
});

static MODEL_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<modelNumber>\s*([^<]*?)\s*</modelNumber>")
        .expect("valid modelNumber pattern")
});

static SERIAL_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<serialNumber>\s*([^<]*?)\s*</serialNumber>")
        .expect("valid serialNumber pattern")
});

/// A device that answered the search with a usable description location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub ip: Ipv4Addr,
    /// Path of the description document, e.g. `/description.xml`.
    pub path: String,
}

impl Candidate {
    /// Extracts the candidate from a search response's `LOCATION` header.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_bridge_rs::Candidate;
    ///
    /// let response = "HTTP/1.1 200 OK\r\nLOCATION: http://192.168.1.2:80/description.xml\r\n\r\n";
    /// let candidate = Candidate::from_response(response).unwrap();
    /// assert_eq!(candidate.ip.to_string(), "192.168.1.2");
    /// assert_eq!(candidate.path, "/description.xml");
    ///
    /// let other_port = "LOCATION: http://192.168.1.9:49153/setup.xml\r\n";
    /// assert!(Candidate::from_response(other_port).is_none());
    /// ```
    pub fn from_response(response: &str) -> Option<Self> {
        let captures = LOCATION.captures(response)?;
        let port: u16 = captures[2].parse().ok()?;
        if port != DESCRIPTION_PORT {
            return None;
        }
        let ip: Ipv4Addr = captures[1].parse().ok()?;
        Some(Candidate {
            ip,
            path: captures[3].to_string(),
        })
    }
}

/// Candidates in the order they first answered, one per address.
#[derive(Debug, Default)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a response and returns whether it added a new address.
    pub fn offer(&mut self, response: &str) -> bool {
        let Some(candidate) = Candidate::from_response(response) else {
            return false;
        };
        if self.candidates.iter().any(|known| known.ip == candidate.ip) {
            return false;
        }
        debug!("SSDP candidate {}{}", candidate.ip, candidate.path);
        self.candidates.push(candidate);
        true
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.candidates
    }
}

/// Source of bridge candidates on the local network.
pub trait Scanner: Send + Sync {
    /// Collects candidates for the whole `window`.
    fn scan(&self, window: Duration) -> BoxFuture<'_, Result<Vec<Candidate>>>;
}

/// Multicast `M-SEARCH` scanner.
#[derive(Debug, Clone)]
pub struct SsdpScanner {
    recv_timeout: Duration,
    multicast_ttl: u32,
    target: String,
}

impl SsdpScanner {
    pub fn new(recv_timeout: Duration, multicast_ttl: u32) -> Self {
        SsdpScanner {
            recv_timeout,
            multicast_ttl,
            target: SSDP_ADDR.to_string(),
        }
    }

    /// Sends the search to `target` instead of the SSDP multicast group.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    async fn run(&self, window: Duration) -> Result<Vec<Candidate>> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| Error::socket("bind", e))?;

        socket
            .set_multicast_ttl_v4(self.multicast_ttl)
            .map_err(|e| Error::socket("set_multicast_ttl", e))?;

        socket
            .send_to(M_SEARCH.as_bytes(), &self.target)
            .await
            .map_err(|e| Error::socket("send_to", e))?;

        let mut candidates = CandidateSet::new();
        let start = Instant::now();
        let mut buffer = [0u8; 2048];

        // More than one device answers, so keep listening for the whole window.
        while start.elapsed() < window {
            let wait = self.recv_timeout.min(window.saturating_sub(start.elapsed()));
            match runtime::timeout(wait, socket.recv_from(&mut buffer)).await {
                Ok(Ok((size, _))) => {
                    let response = String::from_utf8_lossy(&buffer[..size]);
                    candidates.offer(&response);
                }
                Ok(Err(e)) => {
                    debug!("SSDP receive failed: {e}");
                    runtime::sleep(wait).await;
                }
                Err(_) => continue,
            }
        }

        info!("SSDP scan found {} candidate(s)", candidates.len());
        Ok(candidates.into_vec())
    }
}

impl Default for SsdpScanner {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 12)
    }
}

impl Scanner for SsdpScanner {
    fn scan(&self, window: Duration) -> BoxFuture<'_, Result<Vec<Candidate>>> {
        self.run(window).boxed()
    }
}

/// The bridge's UPnP description document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeDescriptor {
    pub model_name: String,
    pub model_number: Option<String>,
    pub serial_number: Option<String>,
}

impl BridgeDescriptor {
    const MODEL_TOKENS: [&'static str; 3] = ["Philips", "hue", "bridge"];

    /// Parses the fields of interest out of `description.xml`.
    pub fn parse(xml: &str) -> Result<Self> {
        let model_name = element(xml, &MODEL_NAME)
            .ok_or_else(|| Error::UnexpectedResponse("description without modelName".into()))?;
        Ok(BridgeDescriptor {
            model_name,
            model_number: element(xml, &MODEL_NUMBER),
            serial_number: element(xml, &SERIAL_NUMBER),
        })
    }

    /// Whether the model name carries every vendor, product and category token.
    pub fn is_hue_bridge(&self) -> bool {
        let words: Vec<&str> = self.model_name.split_whitespace().collect();
        Self::MODEL_TOKENS.iter().all(|token| words.contains(token))
    }
}

fn element(xml: &str, pattern: &Regex) -> Option<String> {
    pattern.captures(xml).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HUE_DESCRIPTION: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
<device>
<deviceType>urn:schemas-upnp-org:device:Basic:1</deviceType>
<friendlyName>Philips hue (192.168.1.2)</friendlyName>
<manufacturer>Royal Philips Electronics</manufacturer>
<modelName>Philips hue bridge 2015</modelName>
<modelNumber>BSB002</modelNumber>
<serialNumber>001788fffe100491</serialNumber>
</device>
</root>"#;

    fn response(ip: &str, port: u16) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nCACHE-CONTROL: max-age=100\r\nEXT:\r\n\
             LOCATION: http://{ip}:{port}/description.xml\r\n\
             SERVER: Linux/3.14.0 UPnP/1.0 IpBridge/1.16.0\r\n\r\n"
        )
    }

    #[test]
    fn test_duplicate_responses_yield_one_candidate() {
        let mut set = CandidateSet::new();
        assert!(set.offer(&response("192.168.1.2", 80)));
        assert!(!set.offer(&response("192.168.1.2", 80)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_candidates_keep_discovery_order() {
        let mut set = CandidateSet::new();
        set.offer(&response("192.168.1.7", 80));
        set.offer(&response("192.168.1.3", 80));
        set.offer(&response("192.168.1.7", 80));
        let ips: Vec<String> = set.into_vec().iter().map(|c| c.ip.to_string()).collect();
        assert_eq!(ips, ["192.168.1.7", "192.168.1.3"]);
    }

    #[test]
    fn test_non_http_port_is_rejected() {
        let mut set = CandidateSet::new();
        assert!(!set.offer(&response("192.168.1.4", 8080)));
        assert!(!set.offer("NOTIFY * HTTP/1.1\r\nNT: upnp:rootdevice\r\n"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_lowercase_location_header() {
        let response = "HTTP/1.1 200 OK\r\nLocation: http://10.0.0.5:80/description.xml\r\n";
        let candidate = Candidate::from_response(response).unwrap();
        assert_eq!(candidate.ip, Ipv4Addr::new(10, 0, 0, 5));
    }

    #[test]
    fn test_parse_descriptor() {
        let descriptor = BridgeDescriptor::parse(HUE_DESCRIPTION).unwrap();
        assert!(descriptor.is_hue_bridge());
        assert_eq!(descriptor.model_number.as_deref(), Some("BSB002"));
        assert_eq!(
            descriptor.serial_number.as_deref(),
            Some("001788fffe100491")
        );
    }

    #[test]
    fn test_other_device_is_not_a_bridge() {
        let xml = "<root><device><modelName>Sonos PLAY:1</modelName></device></root>";
        let descriptor = BridgeDescriptor::parse(xml).unwrap();
        assert!(!descriptor.is_hue_bridge());
        assert!(descriptor.model_number.is_none());

        assert!(BridgeDescriptor::parse("<html></html>").is_err());
    }

    #[test]
    fn test_descriptor_fields_are_trimmed() {
        let xml = "<device><modelName>\n  Philips hue bridge 2012\n</modelName>\
                   <serialNumber> 0017880a1b2c </serialNumber></device>";
        let descriptor = BridgeDescriptor::parse(xml).unwrap();
        assert_eq!(descriptor.model_name, "Philips hue bridge 2012");
        assert_eq!(descriptor.serial_number.as_deref(), Some("0017880a1b2c"));
        assert!(descriptor.model_number.is_none());
    }

    #[tokio::test]
    async fn test_scan_listens_for_the_whole_window() {
        let responder = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = responder.local_addr().unwrap().to_string();

        let replies = tokio::spawn(async move {
            let mut buffer = [0u8; 512];
            let (size, scanner) = responder.recv_from(&mut buffer).await.unwrap();
            assert!(buffer[..size].starts_with(b"M-SEARCH"));

            let first = response("192.168.1.2", 80);
            responder.send_to(first.as_bytes(), scanner).await.unwrap();
            responder.send_to(first.as_bytes(), scanner).await.unwrap();
            // Longer than the receive timeout, still inside the window.
            tokio::time::sleep(Duration::from_millis(300)).await;
            let second = response("192.168.1.3", 80);
            responder.send_to(second.as_bytes(), scanner).await.unwrap();
        });

        let window = Duration::from_secs(1);
        let recv_timeout = Duration::from_millis(100);
        let scanner = SsdpScanner::new(recv_timeout, 1).with_target(target);
        let start = std::time::Instant::now();
        let candidates = scanner.scan(window).await.unwrap();
        replies.await.unwrap();

        assert!(start.elapsed() >= window);
        let ips: Vec<Ipv4Addr> = candidates.iter().map(|c| c.ip).collect();
        assert_eq!(
            ips,
            [Ipv4Addr::new(192, 168, 1, 2), Ipv4Addr::new(192, 168, 1, 3)]
        );
    }
}
