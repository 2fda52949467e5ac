use crate::error::{AppError, AppResult, ValidationError};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Datelike, Duration, Utc};
use reqwest::Url;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Created,
    Captured,
    Refunded,
    Canceled,
    Failed,
    /// Terminal status reported by the checkout callback; equivalent to captured.
    Success,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Created => "created",
            PaymentStatus::Captured => "captured",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Success => "success",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final status a checkout callback may report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallbackStatus {
    Success,
    Failed,
    Canceled,
}

impl CallbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackStatus::Success => "success",
            CallbackStatus::Failed => "failed",
            CallbackStatus::Canceled => "canceled",
        }
    }

    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            CallbackStatus::Success => PaymentStatus::Success,
            CallbackStatus::Failed => PaymentStatus::Failed,
            CallbackStatus::Canceled => PaymentStatus::Canceled,
        }
    }
}

impl FromStr for CallbackStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "success" => Ok(CallbackStatus::Success),
            "failed" => Ok(CallbackStatus::Failed),
            "canceled" | "cancelled" => Ok(CallbackStatus::Canceled),
            _ => Err(AppError::validation(ValidationError::InvalidStatus {
                status: value.to_string(),
            })),
        }
    }
}

/// Host platform URLs the shopper is sent back to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallbackUrls {
    pub success: String,
    pub failure: String,
    pub cancel: String,
}

impl CallbackUrls {
    pub fn validate(&self) -> AppResult<()> {
        for (field, value) in [
            ("callbackUrls.success", &self.success),
            ("callbackUrls.failure", &self.failure),
            ("callbackUrls.cancel", &self.cancel),
        ] {
            validate_http_url(field, value)?;
        }
        Ok(())
    }

    pub fn url_for(&self, status: CallbackStatus) -> &str {
        match status {
            CallbackStatus::Success => &self.success,
            CallbackStatus::Failed => &self.failure,
            CallbackStatus::Canceled => &self.cancel,
        }
    }
}

fn validate_http_url(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(ValidationError::MissingField {
            field: field.to_string(),
        }));
    }
    let url = Url::parse(value).map_err(|e| {
        AppError::validation(ValidationError::InvalidUrl {
            field: field.to_string(),
            reason: e.to_string(),
        })
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(AppError::validation(ValidationError::InvalidUrl {
            field: field.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Unknown,
}

impl CardBrand {
    fn detect(digits: &str) -> Self {
        let prefix2: u32 = digits.get(..2).and_then(|p| p.parse().ok()).unwrap_or(0);
        let prefix4: u32 = digits.get(..4).and_then(|p| p.parse().ok()).unwrap_or(0);
        if digits.starts_with('4') {
            CardBrand::Visa
        } else if (51..=55).contains(&prefix2) || (2221..=2720).contains(&prefix4) {
            CardBrand::Mastercard
        } else if prefix2 == 34 || prefix2 == 37 {
            CardBrand::Amex
        } else if prefix4 == 6011 || prefix2 == 65 {
            CardBrand::Discover
        } else {
            CardBrand::Unknown
        }
    }
}

/// Raw card input. Never stored and never logged.
#[derive(Clone, Deserialize)]
pub struct CardDetails {
    pub number: String,
    pub expiry: String,
    pub cvv: String,
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &"<redacted>")
            .field("expiry", &"<redacted>")
            .field("cvv", &"<redacted>")
            .finish()
    }
}

/// What survives of a card after validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MaskedCard {
    pub last4: String,
    pub brand: CardBrand,
}

/// Three upper-case ASCII letters.
pub fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

/// Parse `MM/YY` into (year, month).
fn parse_expiry(expiry: &str) -> Option<(i32, u32)> {
    let (month, year) = expiry.trim().split_once('/')?;
    if month.len() != 2 || year.len() != 2 {
        return None;
    }
    let month: u32 = month.parse().ok()?;
    let year: i32 = year.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((2000 + year, month))
}

fn luhn_valid(digits: &str) -> bool {
    let sum: u32 = digits
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

impl CardDetails {
    /// Validate the card against `now` and reduce it to its masked form.
    pub fn validate(&self, now: DateTime<Utc>) -> AppResult<MaskedCard> {
        let digits: String = self
            .number
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();

        if digits.is_empty() {
            return Err(AppError::validation(ValidationError::MissingField {
                field: "cardDetails.number".to_string(),
            }));
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) || !(12..=19).contains(&digits.len()) {
            return Err(card_error("number", "must contain 12 to 19 digits"));
        }
        if !luhn_valid(&digits) {
            return Err(card_error("number", "failed checksum"));
        }

        let (year, month) =
            parse_expiry(&self.expiry).ok_or_else(|| card_error("expiry", "expected MM/YY"))?;
        if (year, month) < (now.year(), now.month()) {
            return Err(card_error("expiry", "card has expired"));
        }

        let cvv = self.cvv.trim();
        if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
            return Err(card_error("cvv", "must be 3 or 4 digits"));
        }

        Ok(MaskedCard {
            last4: digits[digits.len() - 4..].to_string(),
            brand: CardBrand::detect(&digits),
        })
    }
}

fn card_error(field: &'static str, reason: &str) -> AppError {
    AppError::validation(ValidationError::InvalidCard {
        field,
        reason: reason.to_string(),
    })
}

/// Reject zero and negative amounts.
pub fn validate_positive(amount: &BigDecimal, field: &str) -> AppResult<()> {
    if *amount <= BigDecimal::zero() {
        return Err(AppError::validation(ValidationError::InvalidAmount {
            amount: amount.to_string(),
            reason: format!("{} must be greater than zero", field),
        }));
    }
    Ok(())
}

/// Upper-case and check a currency code, falling back to `default` when absent.
pub fn normalize_currency(currency: Option<&str>, default: &str) -> AppResult<String> {
    let currency = match currency.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_uppercase(),
        _ => default.to_uppercase(),
    };
    if !is_currency_code(&currency) {
        return Err(AppError::validation(ValidationError::InvalidCurrency {
            currency,
        }));
    }
    Ok(currency)
}

/// Amount as it arrives on the wire: a JSON number or a decimal string.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireAmount {
    Text(String),
    Number(serde_json::Number),
}

impl WireAmount {
    // Numbers go through their shortest textual form, so `19.99` stays
    // `19.99` instead of the exact expansion of the nearest f64.
    fn into_decimal(self) -> Result<BigDecimal, String> {
        let text = match self {
            WireAmount::Text(text) => text,
            WireAmount::Number(number) => number.to_string(),
        };
        BigDecimal::from_str(text.trim()).map_err(|e| format!("invalid amount '{}': {}", text, e))
    }
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    WireAmount::deserialize(deserializer)?
        .into_decimal()
        .map_err(de::Error::custom)
}

fn deserialize_optional_amount<'de, D>(deserializer: D) -> Result<Option<BigDecimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<WireAmount>::deserialize(deserializer)?
        .map(WireAmount::into_decimal)
        .transpose()
        .map_err(de::Error::custom)
}

/// Stored state for one checkout attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub payment_id: String,
    pub order_id: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub callback_urls: CallbackUrls,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<MaskedCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_amount: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_amount: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_instance_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new_pending(
        payment_id: String,
        order_id: String,
        amount: BigDecimal,
        currency: String,
        callback_urls: CallbackUrls,
    ) -> Self {
        let now = Utc::now();
        Self {
            payment_id,
            order_id,
            amount,
            currency,
            status: PaymentStatus::Pending,
            callback_urls,
            card: None,
            captured_amount: None,
            refunded_amount: None,
            refund_reason: None,
            cancel_reason: None,
            platform_instance_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`, keeping it strictly increasing.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }
}

// Request bodies

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectRequest {
    pub order_id: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: BigDecimal,
    pub currency: Option<String>,
    pub callback_urls: CallbackUrls,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub payment_id: String,
    pub card_details: CardDetails,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturePaymentRequest {
    pub payment_id: String,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub amount: Option<BigDecimal>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundPaymentRequest {
    pub payment_id: String,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub amount: Option<BigDecimal>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelPaymentRequest {
    pub payment_id: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackRequest {
    pub payment_id: String,
    pub status: String,
}

// Response bodies

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectResponse {
    pub redirect_url: String,
    pub transaction_id: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub amount: BigDecimal,
    pub currency: String,
    pub card: MaskedCard,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    pub capture_id: String,
    pub payment_id: String,
    pub status: PaymentStatus,
    pub amount: BigDecimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub refund_id: String,
    pub payment_id: String,
    pub status: PaymentStatus,
    pub amount: BigDecimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub cancellation_id: String,
    pub payment_id: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResponse {
    pub redirect_url: String,
    pub status: String,
}
