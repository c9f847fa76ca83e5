use super::{Template, TemplateCategory, TemplateContent};

struct Entry {
    name: &'static str,
    locale: &'static str,
    category: TemplateCategory,
    required: &'static [&'static str],
    subject: &'static str,
    text: &'static str,
    sms: &'static str,
    whatsapp: &'static str,
    media_url: Option<&'static str>,
}

const BOOKING: &[&str] = &["customerName", "reservationId", "pickupLocation", "dropoffLocation", "pickupTime"];
const PAYMENT: &[&str] = &["customerName", "reservationId", "amount", "currency"];
const REMINDER: &[&str] = &["customerName", "reservationId", "pickupLocation", "pickupTime", "hours"];
const QR_CODE: &[&str] = &["customerName", "reservationId", "qrCodeUrl"];
const DRIVER: &[&str] = &["customerName", "reservationId", "driverName", "driverPhone", "vehiclePlate"];
const OTP: &[&str] = &["otp"];

const ENTRIES: &[Entry] = &[
    Entry {
        name: "booking_confirmation",
        locale: "tr",
        category: TemplateCategory::Booking,
        required: BOOKING,
        subject: "Rezervasyonunuz onaylandı - {reservationId}",
        text: "Sayın {customerName},\nTransfer rezervasyonunuz onaylandı.\nRezervasyon no: {reservationId}\nAlış: {pickupLocation}\nVarış: {dropoffLocation}\nAlış saati: {pickupTime}",
        sms: "Rezervasyonunuz {reservationId} onaylandi. Alis: {pickupLocation}, {pickupTime}.",
        whatsapp: "Merhaba {customerName}, {reservationId} numaralı rezervasyonunuz onaylandı. {pickupLocation} -> {dropoffLocation}, {pickupTime}.",
        media_url: None,
    },
    Entry {
        name: "booking_confirmation",
        locale: "en",
        category: TemplateCategory::Booking,
        required: BOOKING,
        subject: "Your booking is confirmed - {reservationId}",
        text: "Dear {customerName},\nYour transfer booking is confirmed.\nReservation: {reservationId}\nPickup: {pickupLocation}\nDrop-off: {dropoffLocation}\nPickup time: {pickupTime}",
        sms: "Booking {reservationId} confirmed. Pickup: {pickupLocation}, {pickupTime}.",
        whatsapp: "Hello {customerName}, booking {reservationId} is confirmed. {pickupLocation} -> {dropoffLocation}, {pickupTime}.",
        media_url: None,
    },
    Entry {
        name: "payment_success",
        locale: "tr",
        category: TemplateCategory::Payment,
        required: PAYMENT,
        subject: "Ödemeniz alındı - {reservationId}",
        text: "Sayın {customerName},\n{reservationId} numaralı rezervasyonunuz için {amount} {currency} tutarındaki ödemeniz alındı.",
        sms: "{reservationId} icin {amount} {currency} odemeniz alindi.",
        whatsapp: "Merhaba {customerName}, {reservationId} için {amount} {currency} ödemeniz alındı.",
        media_url: None,
    },
    Entry {
        name: "payment_success",
        locale: "en",
        category: TemplateCategory::Payment,
        required: PAYMENT,
        subject: "Payment received - {reservationId}",
        text: "Dear {customerName},\nWe received your payment of {amount} {currency} for reservation {reservationId}.",
        sms: "Payment of {amount} {currency} received for {reservationId}.",
        whatsapp: "Hello {customerName}, we received {amount} {currency} for booking {reservationId}.",
        media_url: None,
    },
    Entry {
        name: "transfer_reminder",
        locale: "tr",
        category: TemplateCategory::Reminder,
        required: REMINDER,
        subject: "Transferinize {hours} saat kaldı - {reservationId}",
        text: "Sayın {customerName},\nTransferinize {hours} saat kaldı.\nAlış: {pickupLocation}\nAlış saati: {pickupTime}",
        sms: "Hatirlatma: {reservationId} transferiniz {hours} saat sonra, {pickupLocation} {pickupTime}.",
        whatsapp: "Merhaba {customerName}, transferinize {hours} saat kaldı. Alış: {pickupLocation}, {pickupTime}.",
        media_url: None,
    },
    Entry {
        name: "transfer_reminder",
        locale: "en",
        category: TemplateCategory::Reminder,
        required: REMINDER,
        subject: "Your transfer is in {hours} hours - {reservationId}",
        text: "Dear {customerName},\nYour transfer starts in {hours} hours.\nPickup: {pickupLocation}\nPickup time: {pickupTime}",
        sms: "Reminder: transfer {reservationId} in {hours}h, {pickupLocation} {pickupTime}.",
        whatsapp: "Hello {customerName}, your transfer starts in {hours} hours. Pickup: {pickupLocation}, {pickupTime}.",
        media_url: None,
    },
    Entry {
        name: "qr_code",
        locale: "tr",
        category: TemplateCategory::Access,
        required: QR_CODE,
        subject: "Biniş QR kodunuz - {reservationId}",
        text: "Sayın {customerName},\n{reservationId} için biniş QR kodunuz: {qrCodeUrl}",
        sms: "{reservationId} QR kodunuz: {qrCodeUrl}",
        whatsapp: "Merhaba {customerName}, {reservationId} için biniş QR kodunuz ektedir.",
        media_url: Some("{qrCodeUrl}"),
    },
    Entry {
        name: "qr_code",
        locale: "en",
        category: TemplateCategory::Access,
        required: QR_CODE,
        subject: "Your boarding QR code - {reservationId}",
        text: "Dear {customerName},\nYour boarding QR code for {reservationId}: {qrCodeUrl}",
        sms: "QR code for {reservationId}: {qrCodeUrl}",
        whatsapp: "Hello {customerName}, your boarding QR code for {reservationId} is attached.",
        media_url: Some("{qrCodeUrl}"),
    },
    Entry {
        name: "driver_assignment",
        locale: "tr",
        category: TemplateCategory::Driver,
        required: DRIVER,
        subject: "Şoförünüz atandı - {reservationId}",
        text: "Sayın {customerName},\nŞoförünüz {driverName} ({driverPhone}), araç plakası {vehiclePlate}.",
        sms: "Soforunuz {driverName} {driverPhone}, plaka {vehiclePlate}.",
        whatsapp: "Merhaba {customerName}, şoförünüz {driverName} ({driverPhone}). Araç: {vehiclePlate}.",
        media_url: None,
    },
    Entry {
        name: "driver_assignment",
        locale: "en",
        category: TemplateCategory::Driver,
        required: DRIVER,
        subject: "Your driver is assigned - {reservationId}",
        text: "Dear {customerName},\nYour driver is {driverName} ({driverPhone}), vehicle plate {vehiclePlate}.",
        sms: "Driver {driverName} {driverPhone}, plate {vehiclePlate}.",
        whatsapp: "Hello {customerName}, your driver is {driverName} ({driverPhone}). Vehicle: {vehiclePlate}.",
        media_url: None,
    },
    Entry {
        name: "otp",
        locale: "tr",
        category: TemplateCategory::Security,
        required: OTP,
        subject: "Doğrulama kodunuz",
        text: "Doğrulama kodunuz: {otp}\nBu kodu kimseyle paylaşmayın.",
        sms: "Dogrulama kodunuz: {otp}. Kimseyle paylasmayin.",
        whatsapp: "Doğrulama kodunuz: {otp}",
        media_url: None,
    },
    Entry {
        name: "otp",
        locale: "en",
        category: TemplateCategory::Security,
        required: OTP,
        subject: "Your verification code",
        text: "Your verification code is {otp}\nDo not share this code.",
        sms: "Your verification code is {otp}. Do not share it.",
        whatsapp: "Your verification code is {otp}",
        media_url: None,
    },
];

fn html(text: &str) -> String {
    let paragraphs: String = text.lines().map(|line| format!("<p>{line}</p>")).collect();
    format!("<html><body>{paragraphs}</body></html>")
}

impl Entry {
    fn templates(&self) -> [Template; 3] {
        let template = |content| Template {
            id: format!("{}_{}", self.name, self.locale),
            locale: self.locale.to_string(),
            category: self.category,
            required_variables: self.required.iter().map(ToString::to_string).collect(),
            content,
        };

        [
            template(TemplateContent::Email {
                subject: self.subject.to_string(),
                html: html(self.text),
                text: self.text.to_string(),
            }),
            template(TemplateContent::Sms { body: self.sms.to_string() }),
            template(TemplateContent::WhatsApp {
                body: self.whatsapp.to_string(),
                media_url: self.media_url.map(ToString::to_string),
            }),
        ]
    }
}

pub(super) fn templates() -> impl Iterator<Item = Template> {
    ENTRIES.iter().flat_map(Entry::templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{channel::Channel, template::TemplateRegistry};

    const NAMES: [&str; 6] = [
        "booking_confirmation",
        "payment_success",
        "transfer_reminder",
        "qr_code",
        "driver_assignment",
        "otp",
    ];

    #[test]
    fn test_every_flow_has_every_locale_and_channel() {
        let registry = TemplateRegistry::builtin();

        for name in NAMES {
            for locale in ["tr", "en"] {
                for channel in Channel::DISPATCH_ORDER {
                    let id = format!("{name}_{locale}");
                    assert!(registry.get_template(channel, &id).is_some(), "{channel} {id}");
                }
            }
        }
        assert_eq!(registry.len(), NAMES.len() * 2 * 3);
    }

    #[test]
    fn test_placeholders_are_declared() {
        for template in templates() {
            let variables = template
                .required_variables
                .iter()
                .map(|name| (name.clone(), "x".to_string()))
                .collect();

            assert!(template.content.missing(&variables).is_empty(), "{}", template.id);
        }
    }
}
