use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{MAX_ASSET_AMOUNT, MAX_PRECISION, MAX_PRINCIPAL_LEN, MAX_SYMBOL_CODE_LEN};
use crate::error::MembraError;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

// ── Principal ────────────────────────────────────────────────────────────────

/// Host account name: 1–12 characters from `a-z`, `1-5` and `.`, never
/// ending in `.`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    pub fn new(name: &str) -> Result<Self, MembraError> {
        let valid = !name.is_empty()
            && name.len() <= MAX_PRINCIPAL_LEN
            && !name.ends_with('.')
            && name
                .bytes()
                .all(|b| matches!(b, b'a'..=b'z' | b'1'..=b'5' | b'.'));
        if !valid {
            return Err(MembraError::InvalidName(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Principal {
    type Err = MembraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Principal {
    type Error = MembraError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> Self {
        p.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.0)
    }
}

// ── SymbolCode / Symbol ──────────────────────────────────────────────────────

/// Currency code: 1–7 upper-case ASCII letters (e.g. `TLOS`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SymbolCode(String);

impl SymbolCode {
    pub fn new(code: &str) -> Result<Self, MembraError> {
        let valid = !code.is_empty()
            && code.len() <= MAX_SYMBOL_CODE_LEN
            && code.bytes().all(|b| b.is_ascii_uppercase());
        if !valid {
            return Err(MembraError::InvalidSymbol(code.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SymbolCode {
    type Err = MembraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SymbolCode {
    type Error = MembraError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<SymbolCode> for String {
    fn from(c: SymbolCode) -> Self {
        c.0
    }
}

impl fmt::Display for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolCode({})", self.0)
    }
}

/// A currency code together with its decimal precision, written `4,TLOS`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol {
    pub precision: u8,
    pub code: SymbolCode,
}

impl Symbol {
    pub fn new(precision: u8, code: &str) -> Result<Self, MembraError> {
        if precision > MAX_PRECISION {
            return Err(MembraError::InvalidSymbol(format!("{precision},{code}")));
        }
        Ok(Self {
            precision,
            code: SymbolCode::new(code)?,
        })
    }
}

impl FromStr for Symbol {
    type Err = MembraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (precision, code) = s
            .split_once(',')
            .ok_or_else(|| MembraError::InvalidSymbol(s.to_string()))?;
        let precision: u8 = precision
            .trim()
            .parse()
            .map_err(|_| MembraError::InvalidSymbol(s.to_string()))?;
        Self::new(precision, code.trim())
    }
}

impl TryFrom<String> for Symbol {
    type Error = MembraError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Symbol> for String {
    fn from(s: Symbol) -> Self {
        s.to_string()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({self})")
    }
}

// ── Asset ────────────────────────────────────────────────────────────────────

/// A signed quantity of base units in one symbol. Text form: `12.5000 TLOS`.
///
/// Valid when `|amount| <= MAX_ASSET_AMOUNT`. Arithmetic helpers refuse to
/// mix symbols or leave the valid range.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Asset {
    pub amount: i64,
    pub symbol: Symbol,
}

impl Asset {
    pub fn new(amount: i64, symbol: Symbol) -> Result<Self, MembraError> {
        let asset = Self { amount, symbol };
        if !asset.is_valid() {
            return Err(MembraError::InvalidAsset(asset.to_string()));
        }
        Ok(asset)
    }

    pub fn zero(symbol: Symbol) -> Self {
        Self { amount: 0, symbol }
    }

    pub fn is_valid(&self) -> bool {
        (-MAX_ASSET_AMOUNT..=MAX_ASSET_AMOUNT).contains(&self.amount)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn checked_add(&self, other: &Asset) -> Result<Asset, MembraError> {
        if self.symbol != other.symbol {
            return Err(MembraError::InvalidQuantity("symbol mismatch".into()));
        }
        self.amount
            .checked_add(other.amount)
            .and_then(|amount| Asset::new(amount, self.symbol.clone()).ok())
            .ok_or_else(|| MembraError::InvalidQuantity("addition overflow".into()))
    }

    pub fn checked_sub(&self, other: &Asset) -> Result<Asset, MembraError> {
        if self.symbol != other.symbol {
            return Err(MembraError::InvalidQuantity("symbol mismatch".into()));
        }
        self.amount
            .checked_sub(other.amount)
            .and_then(|amount| Asset::new(amount, self.symbol.clone()).ok())
            .ok_or_else(|| MembraError::InvalidQuantity("subtraction underflow".into()))
    }
}

impl FromStr for Asset {
    type Err = MembraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || MembraError::InvalidAsset(s.to_string());

        let (number, code) = s.trim().split_once(' ').ok_or_else(bad)?;
        let code = SymbolCode::new(code.trim()).map_err(|_| bad())?;

        let (negative, digits) = match number.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, number),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) if !f.is_empty() => (i, f),
            Some(_) => return Err(bad()),
            None => (digits, ""),
        };
        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
            || frac_part.len() > MAX_PRECISION as usize
        {
            return Err(bad());
        }

        let precision = frac_part.len() as u32;
        let int_value: i128 = int_part.parse().map_err(|_| bad())?;
        let frac_value: i128 = if frac_part.is_empty() { 0 } else { frac_part.parse().map_err(|_| bad())? };
        let magnitude = int_value
            .checked_mul(10i128.pow(precision))
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(bad)?;
        if magnitude > MAX_ASSET_AMOUNT as i128 {
            return Err(bad());
        }
        let amount = if negative { -(magnitude as i64) } else { magnitude as i64 };

        Ok(Self {
            amount,
            symbol: Symbol { precision: precision as u8, code },
        })
    }
}

impl TryFrom<String> for Asset {
    type Error = MembraError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Asset> for String {
    fn from(a: Asset) -> Self {
        a.to_string()
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let magnitude = self.amount.unsigned_abs();
        let precision = self.symbol.precision as u32;
        if precision == 0 {
            return write!(f, "{sign}{magnitude} {}", self.symbol.code);
        }
        let scale = 10u64.pow(precision);
        write!(
            f,
            "{sign}{}.{:0width$} {}",
            magnitude / scale,
            magnitude % scale,
            self.symbol.code,
            width = precision as usize
        )
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Asset({self})")
    }
}

// ── AccountType ──────────────────────────────────────────────────────────────

/// Single-character account category tag (e.g. `e` for individuals).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountType(pub char);

impl FromStr for AccountType {
    type Err = MembraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Self(c)),
            _ => Err(MembraError::InvalidAccountType(s.to_string())),
        }
    }
}

impl TryFrom<String> for AccountType {
    type Error = MembraError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AccountType> for String {
    fn from(t: AccountType) -> Self {
        t.0.to_string()
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountType({:?})", self.0)
    }
}

// ── RequestId ────────────────────────────────────────────────────────────────

/// 32-byte request identifier: BLAKE3 of the bincode-encoded request.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub [u8; 32]);

impl RequestId {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({}…)", &self.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_rules() {
        assert!(Principal::new("alice").is_ok());
        assert!(Principal::new("a.b1c2d3e4f5").is_ok());
        assert!(Principal::new("").is_err());
        assert!(Principal::new("Alice").is_err());
        assert!(Principal::new("alice6").is_err());
        assert!(Principal::new("trailing.").is_err());
        assert!(Principal::new("thirteenchars").is_err());
    }

    #[test]
    fn asset_text_form() {
        let a: Asset = "12.5000 TLOS".parse().unwrap();
        assert_eq!(a.amount, 125_000);
        assert_eq!(a.symbol, Symbol::new(4, "TLOS").unwrap());
        assert_eq!(a.to_string(), "12.5000 TLOS");

        let whole: Asset = "7 VOTE".parse().unwrap();
        assert_eq!(whole.symbol.precision, 0);
        assert_eq!(whole.to_string(), "7 VOTE");

        let neg: Asset = "-0.0100 TLOS".parse().unwrap();
        assert_eq!(neg.amount, -100);
        assert_eq!(neg.to_string(), "-0.0100 TLOS");
    }

    #[test]
    fn asset_rejects_malformed_text() {
        for bad in ["", "1.0000", "1. TLOS", ".5 TLOS", "1.0000 tlos", "1x TLOS", "1.0 TOOLONGX"] {
            assert!(bad.parse::<Asset>().is_err(), "{bad:?} should not parse");
        }
        let too_big = format!("{} TLOS", MAX_ASSET_AMOUNT as i128 + 1);
        assert!(too_big.parse::<Asset>().is_err());
    }

    #[test]
    fn asset_arithmetic_is_symbol_checked() {
        let a: Asset = "1.0000 TLOS".parse().unwrap();
        let b: Asset = "0.2500 TLOS".parse().unwrap();
        assert_eq!(a.checked_add(&b).unwrap().to_string(), "1.2500 TLOS");
        assert_eq!(a.checked_sub(&b).unwrap().to_string(), "0.7500 TLOS");

        let other: Asset = "1.00 TLOS".parse().unwrap();
        assert!(a.checked_add(&other).is_err(), "precision differs");

        let max = Asset::new(MAX_ASSET_AMOUNT, a.symbol.clone()).unwrap();
        assert!(max.checked_add(&a).is_err());
    }

    #[test]
    fn symbol_text_form() {
        let s: Symbol = "4,TLOS".parse().unwrap();
        assert_eq!(s.to_string(), "4,TLOS");
        assert!("19,TLOS".parse::<Symbol>().is_err());
        assert!("TLOS".parse::<Symbol>().is_err());
    }

    #[test]
    fn account_type_is_one_char() {
        assert_eq!("e".parse::<AccountType>().unwrap(), AccountType('e'));
        assert!(matches!("".parse::<AccountType>(), Err(MembraError::InvalidAccountType(_))));
        assert!(matches!("ab".parse::<AccountType>(), Err(MembraError::InvalidAccountType(_))));
    }

    #[test]
    fn serde_uses_text_forms() {
        let a: Asset = "3.0000 TLOS".parse().unwrap();
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"3.0000 TLOS\"");
        let back: Asset = serde_json::from_str("\"3.0000 TLOS\"").unwrap();
        assert_eq!(back, a);
        assert!(serde_json::from_str::<Principal>("\"BAD\"").is_err());
    }
}
