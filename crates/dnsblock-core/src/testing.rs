//! Scripted resolver for unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::alias::{Hop, NameResolver};
use crate::domain::Domain;
use crate::error::ResolveFailure;

#[derive(Default)]
pub struct ScriptedResolver {
    hops: HashMap<String, Result<Hop, ResolveFailure>>,
    hosts: HashMap<IpAddr, Result<String, ResolveFailure>>,
    delays: HashMap<IpAddr, Duration>,
    forward_calls: AtomicUsize,
    reverse_calls: AtomicUsize,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, name: &str, target: &str) -> Self {
        let target = Domain::parse(target).unwrap();
        self.hops.insert(name.to_owned(), Ok(Hop::Alias(target)));
        self
    }

    pub fn address(mut self, name: &str) -> Self {
        self.hops.insert(name.to_owned(), Ok(Hop::Address));
        self
    }

    pub fn failure(mut self, name: &str, failure: ResolveFailure) -> Self {
        self.hops.insert(name.to_owned(), Err(failure));
        self
    }

    pub fn host(mut self, ip: &str, hostname: &str) -> Self {
        self.hosts.insert(ip.parse().unwrap(), Ok(hostname.to_owned()));
        self
    }

    pub fn reverse_failure(mut self, ip: &str, failure: ResolveFailure) -> Self {
        self.hosts.insert(ip.parse().unwrap(), Err(failure));
        self
    }

    pub fn delay(mut self, ip: &str, delay: Duration) -> Self {
        self.delays.insert(ip.parse().unwrap(), delay);
        self
    }

    pub fn forward_calls(&self) -> usize {
        self.forward_calls.load(Ordering::SeqCst)
    }

    pub fn reverse_calls(&self) -> usize {
        self.reverse_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NameResolver for ScriptedResolver {
    async fn next_hop(&self, name: &Domain) -> Result<Hop, ResolveFailure> {
        self.forward_calls.fetch_add(1, Ordering::SeqCst);
        self.hops
            .get(&name.to_string())
            .cloned()
            .unwrap_or(Ok(Hop::End))
    }

    async fn reverse(&self, ip: IpAddr) -> Result<String, ResolveFailure> {
        self.reverse_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&ip) {
            tokio::time::sleep(*delay).await;
        }
        self.hosts
            .get(&ip)
            .cloned()
            .unwrap_or(Err(ResolveFailure::NotFound))
    }
}
