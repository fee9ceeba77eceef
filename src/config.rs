use std::env;

/// Pricing and reward knobs applied when a booking is created.
#[derive(Clone, Debug)]
pub struct BookingRules {
    pub service_fee_rate: f64,
    pub min_service_fee: f64,
    pub loyalty_points_per_booking: i32,
    pub default_currency: String,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            service_fee_rate: 0.05,
            min_service_fee: 5.0,
            loyalty_points_per_booking: 10,
            default_currency: "EGP".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub payment_gateway_url: Option<String>,
    pub payment_gateway_api_key: Option<String>,
    pub payment_gateway_timeout_secs: u64,
    pub notification_webhook_url: Option<String>,
    pub occupancy_cache_ttl_secs: u64,
    pub payment_expiry_minutes: i64,
    pub max_concurrent_requests: usize,
    pub bootstrap_admin_token: bool,
    pub booking: BookingRules,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = BookingRules::default();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            payment_gateway_url: env::var("PAYMENT_GATEWAY_URL").ok(),
            payment_gateway_api_key: env::var("PAYMENT_GATEWAY_API_KEY").ok(),
            payment_gateway_timeout_secs: env::var("PAYMENT_GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("PAYMENT_GATEWAY_TIMEOUT_SECS must be a number"),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL").ok(),
            occupancy_cache_ttl_secs: env::var("OCCUPANCY_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .expect("OCCUPANCY_CACHE_TTL_SECS must be a number"),
            payment_expiry_minutes: env::var("PAYMENT_EXPIRY_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("PAYMENT_EXPIRY_MINUTES must be a number"),
            max_concurrent_requests: env::var("MAX_CONCURRENT_REQUESTS")
                .unwrap_or_else(|_| "512".to_string())
                .parse()
                .expect("MAX_CONCURRENT_REQUESTS must be a number"),
            bootstrap_admin_token: env::var("BOOTSTRAP_ADMIN_TOKEN")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            booking: BookingRules {
                service_fee_rate: env::var("SERVICE_FEE_RATE")
                    .ok()
                    .map(|v| v.parse().expect("SERVICE_FEE_RATE must be a number"))
                    .unwrap_or(defaults.service_fee_rate),
                min_service_fee: env::var("MIN_SERVICE_FEE")
                    .ok()
                    .map(|v| v.parse().expect("MIN_SERVICE_FEE must be a number"))
                    .unwrap_or(defaults.min_service_fee),
                loyalty_points_per_booking: env::var("LOYALTY_POINTS_PER_BOOKING")
                    .ok()
                    .map(|v| v.parse().expect("LOYALTY_POINTS_PER_BOOKING must be a number"))
                    .unwrap_or(defaults.loyalty_points_per_booking),
                default_currency: env::var("DEFAULT_CURRENCY")
                    .unwrap_or(defaults.default_currency),
            },
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
