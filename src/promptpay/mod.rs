//! PromptPay payment-code payload generator.
//!
//! Builds the EMV merchant-presented QR string a Thai banking app resolves to
//! a recipient (mobile number, national ID, or e-wallet) and optional amount.

pub mod crc;
pub mod tlv;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use tlv::Field;

const ID_PAYLOAD_FORMAT: &str = "00";
const ID_POI_METHOD: &str = "01";
const ID_MERCHANT_INFORMATION_BOT: &str = "29";
const ID_TRANSACTION_CURRENCY: &str = "53";
const ID_TRANSACTION_AMOUNT: &str = "54";
const ID_COUNTRY_CODE: &str = "58";
const ID_CRC: &str = "63";

const PAYLOAD_FORMAT_EMV_QRCPS_MERCHANT_PRESENTED_MODE: &str = "01";
const POI_METHOD_STATIC: &str = "11";
const POI_METHOD_DYNAMIC: &str = "12";
const MERCHANT_INFORMATION_TEMPLATE_ID_GUID: &str = "00";
const BOT_ID_MERCHANT_PHONE_NUMBER: &str = "01";
const BOT_ID_MERCHANT_TAX_ID: &str = "02";
const BOT_ID_MERCHANT_EWALLET_ID: &str = "03";
const GUID_PROMPTPAY: &str = "A000000677010111";
const TRANSACTION_CURRENCY_THB: &str = "764";
const COUNTRY_CODE_TH: &str = "TH";

/// Longest amount string the transaction-amount field accepts.
pub const MAX_AMOUNT_LEN: usize = 13;
/// Longest e-wallet reference that still fits the tag 29 block.
pub const MAX_EWALLET_LEN: usize = 75;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PayloadError {
    #[error("invalid identifier: {0:?} is not a mobile number, national ID or e-wallet reference")]
    InvalidIdentifier(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error(transparent)]
    Encoding(#[from] tlv::TlvError),
}

/// Which account a recipient identifier points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Mobile,
    NationalId,
    EWallet,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Mobile => "mobile",
            AccountKind::NationalId => "national_id",
            AccountKind::EWallet => "e_wallet",
        }
    }

    fn sub_tag(&self) -> &'static str {
        match self {
            AccountKind::Mobile => BOT_ID_MERCHANT_PHONE_NUMBER,
            AccountKind::NationalId => BOT_ID_MERCHANT_TAX_ID,
            AccountKind::EWallet => BOT_ID_MERCHANT_EWALLET_ID,
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip every non-digit character. Idempotent.
pub fn normalize_identifier(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn is_mobile_lead(digit: u8) -> bool {
    matches!(digit, b'6' | b'8' | b'9')
}

/// Classify an already-normalized identifier.
///
/// Mobile numbers are `0[689]` + 8 digits, or the same number written with
/// the `66` country code. National IDs are 13 digits. Any other length up to
/// [`MAX_EWALLET_LEN`] is an e-wallet reference, except ten digits without a
/// mobile prefix, which is a mistyped phone number.
pub fn classify(normalized: &str) -> Result<AccountKind, PayloadError> {
    let bytes = normalized.as_bytes();
    if !bytes.iter().all(u8::is_ascii_digit) {
        return Err(PayloadError::InvalidIdentifier(normalized.to_string()));
    }
    match bytes {
        [b'0', lead, ..] if bytes.len() == 10 && is_mobile_lead(*lead) => Ok(AccountKind::Mobile),
        [b'6', b'6', lead, ..] if bytes.len() == 11 && is_mobile_lead(*lead) => {
            Ok(AccountKind::Mobile)
        }
        _ if bytes.len() == 13 => Ok(AccountKind::NationalId),
        _ if bytes.len() == 10 => Err(PayloadError::InvalidIdentifier(normalized.to_string())),
        _ if (1..=MAX_EWALLET_LEN).contains(&bytes.len()) => Ok(AccountKind::EWallet),
        _ => Err(PayloadError::InvalidIdentifier(normalized.to_string())),
    }
}

/// Value carried under the account sub-tag.
fn account_value(kind: AccountKind, normalized: &str) -> String {
    match kind {
        // national significant number behind 0066, always 13 characters
        AccountKind::Mobile => {
            let national = normalized
                .strip_prefix("66")
                .filter(|_| normalized.len() == 11)
                .or_else(|| normalized.strip_prefix('0'))
                .unwrap_or(normalized);
            format!("0066{national}")
        }
        AccountKind::NationalId | AccountKind::EWallet => normalized.to_string(),
    }
}

/// Validate an amount; `None` means "let the payer type it in".
fn format_amount(amount: Option<f64>) -> Result<Option<String>, PayloadError> {
    let Some(value) = amount else {
        return Ok(None);
    };
    if !value.is_finite() {
        return Err(PayloadError::InvalidAmount(format!("{value} is not finite")));
    }
    if value < 0.0 {
        return Err(PayloadError::InvalidAmount(format!("{value} is negative")));
    }
    if value == 0.0 {
        return Ok(None);
    }
    let formatted = format!("{value:.2}");
    if formatted == "0.00" {
        return Ok(None);
    }
    if formatted.len() > MAX_AMOUNT_LEN {
        return Err(PayloadError::InvalidAmount(format!(
            "{formatted} exceeds {MAX_AMOUNT_LEN} characters"
        )));
    }
    Ok(Some(formatted))
}

/// A validated recipient + amount pair, serialized on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentCode {
    identifier: String,
    kind: AccountKind,
    amount: Option<String>,
    payload: String,
}

impl PaymentCode {
    pub fn new(identifier: &str, amount: Option<f64>) -> Result<Self, PayloadError> {
        let normalized = normalize_identifier(identifier);
        let kind = classify(&normalized)?;
        let amount = format_amount(amount)?;
        let payload = build_payload(&fields(kind, &normalized, amount.as_deref()))?;
        Ok(Self {
            identifier: normalized,
            kind,
            amount,
            payload,
        })
    }

    /// Normalized (digits only) identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn account_kind(&self) -> AccountKind {
        self.kind
    }

    /// Static codes carry no amount and can be reused.
    pub fn is_static(&self) -> bool {
        self.amount.is_none()
    }

    /// Full payload string, checksum included.
    pub fn payload(&self) -> String {
        self.payload.clone()
    }
}

fn fields(kind: AccountKind, identifier: &str, amount: Option<&str>) -> Vec<Field> {
    let poi = if amount.is_none() {
        POI_METHOD_STATIC
    } else {
        POI_METHOD_DYNAMIC
    };
    let mut fields = vec![
        Field::leaf(
            ID_PAYLOAD_FORMAT,
            PAYLOAD_FORMAT_EMV_QRCPS_MERCHANT_PRESENTED_MODE,
        ),
        Field::leaf(ID_POI_METHOD, poi),
        Field::nested(
            ID_MERCHANT_INFORMATION_BOT,
            vec![
                Field::leaf(MERCHANT_INFORMATION_TEMPLATE_ID_GUID, GUID_PROMPTPAY),
                Field::leaf(kind.sub_tag(), account_value(kind, identifier)),
            ],
        ),
        Field::leaf(ID_TRANSACTION_CURRENCY, TRANSACTION_CURRENCY_THB),
    ];
    if let Some(amount) = amount {
        fields.push(Field::leaf(ID_TRANSACTION_AMOUNT, amount));
    }
    fields.push(Field::leaf(ID_COUNTRY_CODE, COUNTRY_CODE_TH));
    fields
}

/// Serialize and append the checksum element.
fn build_payload(fields: &[Field]) -> Result<String, PayloadError> {
    let mut out = tlv::serialize(fields)?;
    out.push_str(ID_CRC);
    out.push_str("04");
    let crc = crc::checksum_hex(&out);
    out.push_str(&crc);
    Ok(out)
}

/// Encode a recipient identifier and optional amount into a PromptPay payload.
///
/// `None`, `Some(0.0)` and amounts that round to `0.00` produce a static code
/// without the amount element.
pub fn encode_payment_payload(identifier: &str, amount: Option<f64>) -> Result<String, PayloadError> {
    PaymentCode::new(identifier, amount).map(|code| code.payload())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_is_idempotent() {
        let once = normalize_identifier(" 081-234 5678 ");
        assert_eq!(once, "0812345678");
        assert_eq!(normalize_identifier(&once), once);
        assert_eq!(normalize_identifier("+66 (81) 234.5678"), "66812345678");
        assert_eq!(normalize_identifier("abc"), "");
    }

    #[test]
    fn classify_buckets() {
        assert_eq!(classify("0812345678"), Ok(AccountKind::Mobile));
        assert_eq!(classify("0612345678"), Ok(AccountKind::Mobile));
        assert_eq!(classify("0912345678"), Ok(AccountKind::Mobile));
        assert_eq!(classify("66812345678"), Ok(AccountKind::Mobile));
        assert_eq!(classify("1234567890123"), Ok(AccountKind::NationalId));
        assert_eq!(classify("012345678901234"), Ok(AccountKind::EWallet));
        assert_eq!(classify(&"1".repeat(MAX_EWALLET_LEN)), Ok(AccountKind::EWallet));
    }

    #[test]
    fn other_lengths_are_e_wallets() {
        for id in ["1", "123", "123456789", "66212345678", "123456789012", "12345678901234"] {
            assert_eq!(classify(id), Ok(AccountKind::EWallet), "{id}");
        }
    }

    #[test]
    fn classify_rejects_unknown_shapes() {
        for bad in ["", "1234567890", "0212345678", "6681234567"] {
            assert!(
                matches!(classify(bad), Err(PayloadError::InvalidIdentifier(_))),
                "{bad} should be rejected"
            );
        }
        assert!(classify(&"1".repeat(MAX_EWALLET_LEN + 1)).is_err());
    }

    #[test]
    fn mobile_value_uses_country_prefix() {
        assert_eq!(account_value(AccountKind::Mobile, "0812345678"), "0066812345678");
        assert_eq!(account_value(AccountKind::Mobile, "66812345678"), "0066812345678");
    }

    #[test]
    fn amount_formatting() {
        assert_eq!(format_amount(Some(100.0)), Ok(Some("100.00".into())));
        assert_eq!(format_amount(Some(1234.5)), Ok(Some("1234.50".into())));
        assert_eq!(format_amount(Some(0.0)), Ok(None));
        assert_eq!(format_amount(None), Ok(None));
        assert!(format_amount(Some(-5.0)).is_err());
        assert!(format_amount(Some(f64::NAN)).is_err());
        assert!(format_amount(Some(f64::INFINITY)).is_err());
        assert!(format_amount(Some(1e12)).is_err());
    }

    #[test]
    fn mobile_with_amount_golden() {
        let payload = encode_payment_payload("081-234-5678", Some(100.0)).unwrap();
        assert_eq!(
            payload,
            "00020101021229370016A0000006770101110113006681234567853037645406100.005802TH6304F142"
        );
    }

    #[test]
    fn national_id_static_golden() {
        let payload = encode_payment_payload("1234567890123", Some(0.0)).unwrap();
        assert_eq!(
            payload,
            "00020101021129370016A0000006770101110213123456789012353037645802TH630433FC"
        );
    }

    #[test]
    fn international_mobile_matches_local_form() {
        let local = encode_payment_payload("0812345678", Some(35.0)).unwrap();
        let intl = encode_payment_payload("+66 81 234 5678", Some(35.0)).unwrap();
        assert_eq!(local, intl);
    }

    #[test]
    fn fourteen_digit_wallet_golden() {
        let code = PaymentCode::new("12345678901234", None).unwrap();
        assert_eq!(code.account_kind(), AccountKind::EWallet);
        assert_eq!(
            code.payload(),
            "00020101021129380016A00000067701011103141234567890123453037645802TH63045C8A"
        );
    }

    #[test]
    fn oversized_merchant_block_is_an_encoding_error() {
        let long = "1".repeat(MAX_EWALLET_LEN);
        let fields = fields(AccountKind::EWallet, &format!("{long}99"), None);
        assert!(matches!(
            build_payload(&fields),
            Err(PayloadError::Encoding(tlv::TlvError::ValueTooLong { .. }))
        ));
    }

    #[test]
    fn errors_surface() {
        assert!(matches!(
            encode_payment_payload("", None),
            Err(PayloadError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            encode_payment_payload("0812345678", Some(-5.0)),
            Err(PayloadError::InvalidAmount(_))
        ));
    }
}
