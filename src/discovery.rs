//! Locating a bridge and obtaining a working credential for it.
//!
//! [`DiscoverySession::establish`] first tries the persisted record as is.
//! Only when the bridge there is gone, or the credential was revoked, does it
//! fall back to an SSDP scan and, if needed, link-button pairing.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::errors::Error;
use crate::runtime::{self, Instant};
use crate::session::{SessionRecord, SessionStore};
use crate::ssdp::{BridgeDescriptor, Candidate, Scanner, SsdpScanner};
use crate::transport::{Connector, HttpConnector, Transport, first_outcome, is_unauthorized};

type Result<T> = std::result::Result<T, Error>;

/// Description document served by every bridge.
pub const DESCRIPTION_PATH: &str = "/description.xml";

/// A bridge that answered as a Hue bridge and accepted the credential.
pub struct Established {
    pub record: SessionRecord,
    pub descriptor: BridgeDescriptor,
    /// Authenticated transport for `record`.
    pub transport: Arc<dyn Transport>,
}

/// Discovery and pairing against one session file.
pub struct DiscoverySession {
    config: BridgeConfig,
    connector: Arc<dyn Connector>,
    scanner: Arc<dyn Scanner>,
    store: SessionStore,
}

impl DiscoverySession {
    pub fn new(config: BridgeConfig) -> Self {
        let connector = Arc::new(HttpConnector::new(config.http_timeout));
        let scanner = Arc::new(SsdpScanner::new(
            config.discovery_recv_timeout,
            config.multicast_ttl,
        ));
        let store = SessionStore::new(&config.session_path);
        DiscoverySession {
            config,
            connector,
            scanner,
            store,
        }
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_scanner(mut self, scanner: Arc<dyn Scanner>) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Establishes a session from the stored record, if any.
    pub async fn establish_stored(&self) -> Result<Established> {
        let persisted = self.store.load()?;
        self.establish(persisted).await
    }

    /// Returns a validated session, scanning and pairing only when needed.
    ///
    /// The record is written back only when it changed.
    pub async fn establish(&self, persisted: Option<SessionRecord>) -> Result<Established> {
        if let Some(record) = &persisted {
            match self.validate(record).await {
                Ok(Some(established)) => {
                    info!("reusing stored session for bridge {}", record.address());
                    return Ok(established);
                }
                Ok(None) => info!("stored session for {} is no longer valid", record.address()),
                Err(err) => warn!("stored bridge {} unreachable: {err}", record.address()),
            }
        }

        let candidates = self.scanner.scan(self.config.discovery_window).await?;
        let Some((candidate, descriptor)) = self.first_bridge(&candidates).await else {
            return Err(Error::BridgeNotFound);
        };
        let address = candidate.ip.to_string();
        info!("found {} at {address}", descriptor.model_name);

        let reused = match persisted.filter(SessionRecord::is_authenticated) {
            Some(old) => {
                let moved = SessionRecord::new(&address, old.credential());
                match self.authorized(&moved).await {
                    Ok(Some(transport)) => Some((moved, transport)),
                    Ok(None) => None,
                    Err(err) => {
                        warn!("credential check on {address} failed: {err}");
                        None
                    }
                }
            }
            None => None,
        };

        let (record, transport) = match reused {
            Some(found) => found,
            None => {
                let unauthenticated = SessionRecord::unauthenticated(&address);
                let credential = self.pair(&unauthenticated).await?;
                let record = unauthenticated.with_credential(credential);
                let transport = self.connector.connect(&record)?;
                (record, transport)
            }
        };

        self.store.save(&record)?;
        Ok(Established {
            record,
            descriptor,
            transport,
        })
    }

    /// Checks that `record` still points at a Hue bridge accepting its credential.
    ///
    /// `Ok(None)` means the bridge answered but the session is unusable.
    async fn validate(&self, record: &SessionRecord) -> Result<Option<Established>> {
        let descriptor = self.describe(record.address(), DESCRIPTION_PATH).await?;
        if !descriptor.is_hue_bridge() {
            debug!("{} is a {}", record.address(), descriptor.model_name);
            return Ok(None);
        }
        if !record.is_authenticated() {
            return Ok(None);
        }
        Ok(self
            .authorized(record)
            .await?
            .map(|transport| Established {
                record: record.clone(),
                descriptor,
                transport,
            }))
    }

    async fn authorized(&self, record: &SessionRecord) -> Result<Option<Arc<dyn Transport>>> {
        let transport = self.connector.connect(record)?;
        let reply = transport.get("").await?;
        if is_unauthorized(&reply) {
            return Ok(None);
        }
        Ok(Some(transport))
    }

    async fn describe(&self, address: &str, path: &str) -> Result<BridgeDescriptor> {
        let transport = self
            .connector
            .connect(&SessionRecord::unauthenticated(address))?;
        let xml = transport.description(path).await?;
        BridgeDescriptor::parse(&xml)
    }

    async fn first_bridge(
        &self,
        candidates: &[Candidate],
    ) -> Option<(Candidate, BridgeDescriptor)> {
        for candidate in candidates {
            let address = candidate.ip.to_string();
            match self.describe(&address, &candidate.path).await {
                Ok(descriptor) if descriptor.is_hue_bridge() => {
                    return Some((candidate.clone(), descriptor));
                }
                Ok(descriptor) => debug!("skipping {address}: {}", descriptor.model_name),
                Err(err) => debug!("skipping {address}: {err}"),
            }
        }
        None
    }

    /// Requests a credential until the link button is pressed or the window ends.
    async fn pair(&self, record: &SessionRecord) -> Result<String> {
        let transport = self.connector.connect(record)?;
        let start = Instant::now();
        info!(
            "press the link button on bridge {} within {:?}",
            record.address(),
            self.config.pairing_window
        );

        while start.elapsed() <= self.config.pairing_window {
            let outcome = transport
                .create_user(&self.config.device_type)
                .await
                .and_then(|reply| first_outcome(&reply));

            match outcome {
                Ok(success) => {
                    if let Some(username) = success.get("username").and_then(|u| u.as_str()) {
                        info!("paired with bridge {}", record.address());
                        return Ok(username.to_string());
                    }
                    warn!("credential reply without username: {success}");
                }
                Err(Error::Remote(remote)) if remote.is_link_button_not_pressed() => {
                    info!("link button not pressed yet");
                }
                Err(err) => warn!("credential request failed: {err}"),
            }

            runtime::sleep(self.config.pairing_backoff).await;
        }

        Err(Error::PairingTimeout)
    }
}
