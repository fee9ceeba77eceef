pub mod notification;
pub mod payment;

pub use notification::{dispatch_events, LogNotifier, NotificationSink, NotifyError, WebhookNotifier};
pub use payment::{GatewayError, GatewayResponse, HttpPaymentGateway, MockPaymentGateway, PaymentGateway};
