//! Kubernetes resource quantity parsing for the two metrics we serve.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid quantity: {0:?}")]
pub struct QuantityError(pub String);

fn split_suffix(q: &str) -> (&str, &str) {
    let idx = q.find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+')).unwrap_or(q.len());
    q.split_at(idx)
}

fn number(digits: &str, raw: &str) -> Result<f64, QuantityError> {
    let v: f64 = digits.parse().map_err(|_| QuantityError(raw.to_string()))?;
    if v < 0.0 || !v.is_finite() {
        return Err(QuantityError(raw.to_string()));
    }
    Ok(v)
}

/// CPU quantity in millicores: `250m` -> 250, `2` -> 2000, `1500000n` -> 2.
pub fn parse_cpu_millis(q: &str) -> Result<u64, QuantityError> {
    let q = q.trim();
    let (digits, suffix) = split_suffix(q);
    let v = number(digits, q)?;
    let millis = match suffix {
        "" => v * 1_000.0,
        "m" => v,
        "u" => v / 1_000.0,
        "n" => v / 1_000_000.0,
        _ => return Err(QuantityError(q.to_string())),
    };
    Ok(millis.round() as u64)
}

/// Memory quantity in bytes, binary (`Ki`..`Ei`) or decimal (`k`..`E`) suffixes.
pub fn parse_memory_bytes(q: &str) -> Result<u64, QuantityError> {
    let q = q.trim();
    let (digits, suffix) = split_suffix(q);
    let v = number(digits, q)?;
    let mult: f64 = match suffix {
        "" => 1.0,
        "Ki" => 1024.0,
        "Mi" => 1024.0_f64.powi(2),
        "Gi" => 1024.0_f64.powi(3),
        "Ti" => 1024.0_f64.powi(4),
        "Pi" => 1024.0_f64.powi(5),
        "Ei" => 1024.0_f64.powi(6),
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "m" => 1e-3,
        _ => return Err(QuantityError(q.to_string())),
    };
    Ok((v * mult).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_units() {
        assert_eq!(parse_cpu_millis("250m"), Ok(250));
        assert_eq!(parse_cpu_millis("2"), Ok(2000));
        assert_eq!(parse_cpu_millis("0.5"), Ok(500));
        assert_eq!(parse_cpu_millis("1500000n"), Ok(2));
        assert_eq!(parse_cpu_millis("3000u"), Ok(3));
        assert!(parse_cpu_millis("lots").is_err());
        assert!(parse_cpu_millis("12Q").is_err());
    }

    #[test]
    fn memory_units() {
        assert_eq!(parse_memory_bytes("1024"), Ok(1024));
        assert_eq!(parse_memory_bytes("4Ki"), Ok(4096));
        assert_eq!(parse_memory_bytes("1Mi"), Ok(1_048_576));
        assert_eq!(parse_memory_bytes("2G"), Ok(2_000_000_000));
        assert!(parse_memory_bytes("").is_err());
        assert!(parse_memory_bytes("-1Ki").is_err());
    }
}
