use std::io::{self, Write};

use clap::Args;
use notification::{Flow, NotificationService, Recipient, Variables};
use serde::Serialize;
use snafu::{ensure, ResultExt};

use crate::{
    config::Config,
    error::{self, Result},
};

#[derive(Clone, Debug, Args)]
pub struct SendArgs {
    #[arg(help = "Flow to send, e.g. booking-confirmation or otp")]
    pub flow: Flow,

    #[arg(long, help = "Customer whose preferences apply")]
    pub customer_id: String,

    #[arg(long, help = "Reservation referenced by the templates")]
    pub reservation_id: Option<String>,

    #[arg(long, help = "Email destination")]
    pub email: Option<String>,

    #[arg(long, help = "Phone destination for SMS and WhatsApp, in E.164")]
    pub phone: Option<String>,

    #[arg(
        long = "var",
        value_name = "KEY=VALUE",
        value_parser = parse_variable,
        help = "Template variable, may be repeated"
    )]
    pub variables: Vec<(String, String)>,
}

fn parse_variable(pair: &str) -> std::result::Result<(String, String), String> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{pair}`")),
    }
}

fn build_service(config: &Config) -> Result<NotificationService> {
    NotificationService::from_config(&config.notification)
        .context(error::InitializeNotificationSnafu)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value).context(error::SerializeOutputSnafu)?;
    text.push('\n');
    io::stdout().write_all(text.as_bytes()).context(error::WriteOutputSnafu)
}

/// Print the provider selected for every channel.
pub fn print_status(config: &Config) -> Result<()> {
    super::block_on(async {
        let service = build_service(config)?;
        print_json(&service.service_status())
    })
}

/// Probe every provider and fail unless each channel has one that verified.
pub fn verify_providers(config: &Config) -> Result<()> {
    super::block_on(async {
        let service = build_service(config)?;
        let verification = service.verify_all_services().await;
        print_json(&verification)?;
        ensure!(verification.all_channels_verified, error::UnverifiedSnafu);
        Ok(())
    })
}

/// Send one flow and print its [`notification::NotificationResult`].
pub fn send_flow(config: &Config, args: SendArgs) -> Result<()> {
    let SendArgs { flow, customer_id, reservation_id, email, phone, variables } = args;
    let variables: Variables = variables.into_iter().collect();

    super::block_on(async move {
        let service = build_service(config)?;
        let request =
            flow.request(customer_id, reservation_id, Recipient { email, phone }, variables);
        let result = service.send_notification(request).await;
        print_json(&result)?;
        ensure!(result.success, error::NotDeliveredSnafu { flow, errors: result.errors.join("; ") });
        Ok(())
    })
}
