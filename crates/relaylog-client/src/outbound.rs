//! Sealing outbound requests.

use std::collections::{HashMap, HashSet, VecDeque};

use relaylog_crypto::{Cipher, Iv};
use relaylog_proto::{Request, encode_for_client, encode_plain};

use crate::{env::Environment, error::ClientError, request::RequestBuilder};

/// Most recent IVs remembered per key.
///
/// IVs are 192 bits drawn from the environment RNG, so a collision with one
/// that has left the window is negligible. The window catches a stuck or
/// misseeded RNG, which repeats within a few draws.
pub const MAX_TRACKED_IVS: usize = 4096;

/// Seals requests with a fresh IV per message.
///
/// The last [`MAX_TRACKED_IVS`] IVs issued under a key are remembered until
/// that key is retired, and a repeat is refused with
/// [`ClientError::IvReuse`] before anything is encrypted.
pub struct Outbound<E: Environment, C: Cipher> {
    env: E,
    cipher: C,
    requests: RequestBuilder<E>,
    issued: HashMap<String, IvHistory>,
}

/// Bounded IV window, evicting the oldest first.
#[derive(Default)]
struct IvHistory {
    order: VecDeque<Iv>,
    seen: HashSet<Iv>,
}

impl IvHistory {
    /// Record `iv`. False if it is already in the window.
    fn insert(&mut self, iv: Iv) -> bool {
        if !self.seen.insert(iv) {
            return false;
        }
        self.order.push_back(iv);
        if self.order.len() > MAX_TRACKED_IVS
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }
        true
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

impl<E: Environment, C: Cipher> Outbound<E, C> {
    /// Sender drawing IVs and timestamps from `env`.
    pub fn new(env: E, cipher: C) -> Self {
        let requests = RequestBuilder::new(env.clone());
        Self { env, cipher, requests, issued: HashMap::new() }
    }

    /// Environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Cipher port.
    pub fn cipher(&self) -> &C {
        &self.cipher
    }

    /// Request builder sharing this sender's environment.
    pub fn requests(&self) -> &RequestBuilder<E> {
        &self.requests
    }

    /// Seal `request` as `<iv>:<client_id>:<base64>` under `key`.
    ///
    /// # Errors
    ///
    /// - `ClientError::IvReuse` if the environment produced an IV still
    ///   tracked under `key`
    /// - `ClientError::MalformedEnvelope` if `client_id` contains `:`
    /// - `ClientError::Cipher` if the cipher port rejects the key
    pub fn seal_for_client(
        &mut self,
        request: &Request,
        key: &str,
        client_id: &str,
    ) -> Result<String, ClientError> {
        self.seal_bytes(&request.to_bytes(), key, client_id)
    }

    /// Seal `requests` as one bulk request: a JSON array under a single IV.
    ///
    /// # Errors
    ///
    /// As for [`Outbound::seal_for_client`].
    pub fn seal_batch_for_client(
        &mut self,
        requests: &[Request],
        key: &str,
        client_id: &str,
    ) -> Result<String, ClientError> {
        self.seal_bytes(Request::batch_json(requests).as_bytes(), key, client_id)
    }

    /// Unencrypted wire text for `request`.
    pub fn seal_plain(&self, request: &Request) -> String {
        encode_plain(&request.to_json())
    }

    /// Unencrypted bulk request.
    pub fn seal_plain_batch(&self, requests: &[Request]) -> String {
        encode_plain(&Request::batch_json(requests))
    }

    /// Forget the IV history of `key`. Call when a key is superseded.
    pub fn retire_key(&mut self, key: &str) {
        self.issued.remove(key);
    }

    /// Number of IVs currently tracked under `key`. Never exceeds
    /// [`MAX_TRACKED_IVS`].
    pub fn issued_count(&self, key: &str) -> usize {
        self.issued.get(key).map_or(0, IvHistory::len)
    }

    fn seal_bytes(
        &mut self,
        plaintext: &[u8],
        key: &str,
        client_id: &str,
    ) -> Result<String, ClientError> {
        let iv = self.next_iv(key)?;
        let wire = encode_for_client(plaintext, &iv.to_hex(), key, client_id, &self.cipher)?;

        tracing::trace!(bytes = wire.len(), "sealed request");
        Ok(wire)
    }

    fn next_iv(&mut self, key: &str) -> Result<Iv, ClientError> {
        let iv = self.env.random_iv();
        let issued = self.issued.entry(key.to_string()).or_default();

        if !issued.insert(iv) {
            tracing::warn!("environment produced a repeated iv; refusing to encrypt");
            return Err(ClientError::IvReuse);
        }
        Ok(iv)
    }
}
