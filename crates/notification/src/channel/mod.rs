//! Delivery channels and the services that dispatch through their providers.

mod service;

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

pub use self::service::{
    ChannelService, ChannelStatus, Dispatched, EmailService, ProviderCheck, ProviderStatus,
    SmsService, WhatsAppService,
};

/// A delivery mechanism with its own provider set and content format.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    #[serde(rename = "whatsapp")]
    WhatsApp,
}

impl Channel {
    /// Order in which one request dispatches its channels.
    pub const DISPATCH_ORDER: [Self; 3] = [Self::WhatsApp, Self::Sms, Self::Email];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::WhatsApp => "whatsapp",
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Per-channel enablement flags.
///
/// Missing fields deserialize as disabled, so `{"sms": true}` selects SMS only.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ChannelSet {
    #[serde(default)]
    pub email: bool,

    #[serde(default)]
    pub sms: bool,

    #[serde(default)]
    pub whatsapp: bool,
}

impl ChannelSet {
    pub const ALL: Self = Self { email: true, sms: true, whatsapp: true };
    pub const NONE: Self = Self { email: false, sms: false, whatsapp: false };

    #[must_use]
    pub const fn only(channel: Channel) -> Self {
        match channel {
            Channel::Email => Self { email: true, ..Self::NONE },
            Channel::Sms => Self { sms: true, ..Self::NONE },
            Channel::WhatsApp => Self { whatsapp: true, ..Self::NONE },
        }
    }

    #[must_use]
    pub const fn contains(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email => self.email,
            Channel::Sms => self.sms,
            Channel::WhatsApp => self.whatsapp,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool { !self.email && !self.sms && !self.whatsapp }

    /// Enabled channels in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::DISPATCH_ORDER.into_iter().filter(|channel| self.contains(*channel))
    }
}
