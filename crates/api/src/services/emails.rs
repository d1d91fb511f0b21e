//! Order emails rendered from Askama templates.
//!
//! Every message has an HTML and a plain-text part.

use askama::Template;
use orderflow_core::{LineItem, Money, Order, Tracking, payment_instructions};

use super::notifier::{EmailMessage, NotifyError};
use crate::config::LifecycleConfig;

/// Line item as shown in emails.
struct ItemLine {
    name: String,
    /// Size and SKU, when known.
    detail: String,
    quantity: u32,
    unit_price: String,
    line_total: String,
}

impl From<&LineItem> for ItemLine {
    fn from(item: &LineItem) -> Self {
        let detail = [
            item.size.as_deref().map(|s| format!("size {s}")),
            item.sku.as_deref().map(|s| format!("SKU {s}")),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");

        Self {
            name: item.name.clone(),
            detail,
            quantity: item.quantity,
            unit_price: Money::new(item.unit_price).to_string(),
            line_total: item
                .extended_price()
                .map_or_else(String::new, |total| Money::new(total).to_string()),
        }
    }
}

/// HTML template for the customer's order confirmation.
#[derive(Template)]
#[template(path = "email/order_received.html")]
struct OrderReceivedHtml<'a> {
    store_name: &'a str,
    greeting_name: &'a str,
    code: &'a str,
    id: String,
    method: String,
    total: String,
    instructions: String,
    items: &'a [ItemLine],
    support_email: Option<&'a str>,
}

/// Plain text template for the customer's order confirmation.
#[derive(Template)]
#[template(path = "email/order_received.txt")]
struct OrderReceivedText<'a> {
    store_name: &'a str,
    greeting_name: &'a str,
    code: &'a str,
    id: String,
    method: String,
    total: String,
    instructions: String,
    items: &'a [ItemLine],
    support_email: Option<&'a str>,
}

/// HTML template for the fulfillment contact.
#[derive(Template)]
#[template(path = "email/order_fulfillment.html")]
struct OrderFulfillmentHtml<'a> {
    code: &'a str,
    id: String,
    method: String,
    total: String,
    customer_email: &'a str,
    customer_name: Option<&'a str>,
    customer_phone: Option<&'a str>,
    ship_to: &'a [String],
    items: &'a [ItemLine],
}

/// Plain text template for the fulfillment contact.
#[derive(Template)]
#[template(path = "email/order_fulfillment.txt")]
struct OrderFulfillmentText<'a> {
    code: &'a str,
    id: String,
    method: String,
    total: String,
    customer_email: &'a str,
    customer_name: Option<&'a str>,
    customer_phone: Option<&'a str>,
    ship_to: &'a [String],
    items: &'a [ItemLine],
}

/// HTML template for the shipping notification.
#[derive(Template)]
#[template(path = "email/order_shipped.html")]
struct OrderShippedHtml<'a> {
    store_name: &'a str,
    code: &'a str,
    carrier: &'a str,
    number: &'a str,
    url: Option<&'a str>,
    support_email: Option<&'a str>,
}

/// Plain text template for the shipping notification.
#[derive(Template)]
#[template(path = "email/order_shipped.txt")]
struct OrderShippedText<'a> {
    store_name: &'a str,
    code: &'a str,
    carrier: &'a str,
    number: &'a str,
    url: Option<&'a str>,
    support_email: Option<&'a str>,
}

/// Builds the lifecycle's outbound messages.
#[derive(Debug, Clone)]
pub struct EmailComposer {
    store_name: String,
    support_email: Option<String>,
}

impl EmailComposer {
    #[must_use]
    pub fn new(config: &LifecycleConfig) -> Self {
        Self {
            store_name: config.store_name.clone(),
            support_email: config.support_email.clone(),
        }
    }

    /// Confirmation with payment instructions, sent to the customer.
    ///
    /// # Errors
    ///
    /// Returns error if a template fails to render.
    pub fn order_received(&self, order: &Order) -> Result<EmailMessage, NotifyError> {
        let items: Vec<ItemLine> = order.items.iter().map(ItemLine::from).collect();
        let instructions = payment_instructions(&order.payment_method, &order.code, order.total);
        let greeting_name = order.customer.name.as_deref().unwrap_or("there");

        let html = OrderReceivedHtml {
            store_name: &self.store_name,
            greeting_name,
            code: order.code.as_str(),
            id: order.id.to_string(),
            method: order.payment_method.label(),
            total: order.total.to_string(),
            instructions: instructions.clone(),
            items: &items,
            support_email: self.support_email.as_deref(),
        }
        .render()?;
        let text = OrderReceivedText {
            store_name: &self.store_name,
            greeting_name,
            code: order.code.as_str(),
            id: order.id.to_string(),
            method: order.payment_method.label(),
            total: order.total.to_string(),
            instructions,
            items: &items,
            support_email: self.support_email.as_deref(),
        }
        .render()?;

        Ok(EmailMessage {
            to: vec![order.customer.email.to_string()],
            reply_to: self.support_email.clone(),
            subject: format!("{}: order {} received", self.store_name, order.code),
            text: Some(text),
            html: Some(html),
            ..EmailMessage::default()
        })
    }

    /// Ship-to details and items, sent to the fulfillment contact.
    ///
    /// # Errors
    ///
    /// Returns error if a template fails to render.
    pub fn order_fulfillment(&self, order: &Order, to: &str) -> Result<EmailMessage, NotifyError> {
        let items: Vec<ItemLine> = order.items.iter().map(ItemLine::from).collect();
        let shipping = &order.shipping;
        let ship_to: Vec<String> = [
            Some(shipping.line1.clone()),
            shipping.line2.clone(),
            Some(format!(
                "{}, {} {}",
                shipping.city, shipping.state, shipping.postal_code
            )),
            Some(shipping.country.clone()),
        ]
        .into_iter()
        .flatten()
        .collect();

        let html = OrderFulfillmentHtml {
            code: order.code.as_str(),
            id: order.id.to_string(),
            method: order.payment_method.label(),
            total: order.total.to_string(),
            customer_email: order.customer.email.as_str(),
            customer_name: order.customer.name.as_deref(),
            customer_phone: order.customer.phone.as_deref(),
            ship_to: &ship_to,
            items: &items,
        }
        .render()?;
        let text = OrderFulfillmentText {
            code: order.code.as_str(),
            id: order.id.to_string(),
            method: order.payment_method.label(),
            total: order.total.to_string(),
            customer_email: order.customer.email.as_str(),
            customer_name: order.customer.name.as_deref(),
            customer_phone: order.customer.phone.as_deref(),
            ship_to: &ship_to,
            items: &items,
        }
        .render()?;

        Ok(EmailMessage {
            to: vec![to.to_owned()],
            reply_to: Some(order.customer.email.to_string()),
            subject: format!("New order {} ({})", order.code, order.total),
            text: Some(text),
            html: Some(html),
            ..EmailMessage::default()
        })
    }

    /// Tracking number and link, sent to the customer.
    ///
    /// # Errors
    ///
    /// Returns error if a template fails to render.
    pub fn order_shipped(
        &self,
        order: &Order,
        tracking: &Tracking,
    ) -> Result<EmailMessage, NotifyError> {
        let carrier = tracking.carrier.as_deref().unwrap_or("our carrier");

        let html = OrderShippedHtml {
            store_name: &self.store_name,
            code: order.code.as_str(),
            carrier,
            number: &tracking.number,
            url: tracking.url.as_deref(),
            support_email: self.support_email.as_deref(),
        }
        .render()?;
        let text = OrderShippedText {
            store_name: &self.store_name,
            code: order.code.as_str(),
            carrier,
            number: &tracking.number,
            url: tracking.url.as_deref(),
            support_email: self.support_email.as_deref(),
        }
        .render()?;

        Ok(EmailMessage {
            to: vec![order.customer.email.to_string()],
            reply_to: self.support_email.clone(),
            subject: format!("{}: order {} has shipped", self.store_name, order.code),
            text: Some(text),
            html: Some(html),
            ..EmailMessage::default()
        })
    }
}
