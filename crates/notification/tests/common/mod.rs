use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use notification::{
    provider::{Message, Provider, ProviderError, Receipt},
    NotificationService, Recipient, Variables,
};

#[derive(Clone, Debug)]
pub enum Behavior {
    Succeed,
    Fail(ProviderError),
    Panic,
}

/// Counts and records every send, then behaves as scripted.
#[derive(Debug)]
pub struct Spy {
    name: &'static str,
    behavior: Behavior,
    calls: AtomicUsize,
    bodies: Mutex<Vec<String>>,
}

impl Spy {
    pub fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self { name, behavior, calls: AtomicUsize::new(0), bodies: Mutex::new(Vec::new()) })
    }

    pub fn succeeding(name: &'static str) -> Arc<Self> { Self::new(name, Behavior::Succeed) }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Self::new(
            name,
            Behavior::Fail(ProviderError::Transport {
                provider: name.to_string(),
                reason: "connection reset".to_string(),
            }),
        )
    }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

    pub fn bodies(&self) -> Vec<String> { self.bodies.lock().unwrap().clone() }
}

#[async_trait]
impl<M: Message> Provider<M> for Spy {
    fn name(&self) -> &str { self.name }

    fn is_available(&self) -> bool { true }

    async fn send(&self, message: &M) -> Result<Receipt, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().unwrap().push(message.body().to_string());
        match &self.behavior {
            Behavior::Succeed => Ok(Receipt::new(format!("{}_{}_{call}", self.name, M::CHANNEL))),
            Behavior::Fail(err) => Err(err.clone()),
            Behavior::Panic => panic!("{} exploded", self.name),
        }
    }

    async fn verify_connection(&self) -> bool { true }
}

/// One spy per channel.
pub struct Spies {
    pub email: Arc<Spy>,
    pub sms: Arc<Spy>,
    pub whatsapp: Arc<Spy>,
}

impl Spies {
    pub fn succeeding() -> Self {
        Self {
            email: Spy::succeeding("email-spy"),
            sms: Spy::succeeding("sms-spy"),
            whatsapp: Spy::succeeding("whatsapp-spy"),
        }
    }

    pub fn total_calls(&self) -> usize { self.email.calls() + self.sms.calls() + self.whatsapp.calls() }

    pub fn service(&self) -> NotificationService {
        NotificationService::builder()
            .email_provider(self.email.clone())
            .sms_provider(self.sms.clone())
            .whatsapp_provider(self.whatsapp.clone())
            .retry(notification::retry::RetryOptions::no_retry())
            .build()
    }
}

pub fn vars(pairs: &[(&str, &str)]) -> Variables {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

pub fn booking_variables() -> Variables {
    vars(&[
        ("customerName", "Ahmet"),
        ("pickupLocation", "Istanbul Airport"),
        ("dropoffLocation", "Kadıköy"),
        ("pickupTime", "2026-10-20 09:15"),
    ])
}

pub fn recipient() -> Recipient {
    Recipient { email: Some("ahmet@example.com".to_string()), phone: Some("+905551234567".to_string()) }
}
