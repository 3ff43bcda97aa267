//! Integer reductions and per-value numeric conversions.
//!
//! Values that do not parse as integers are skipped. The pairwise
//! operations (`-sub`, `-mul`, `-div`, `-mod`) need exactly two numeric
//! inputs and produce nothing otherwise.

use xtract::operation::Extraction;

pub fn integers(values: &[String]) -> Vec<i64> {
    values
        .iter()
        .filter_map(|value| value.trim().parse::<i64>().ok())
        .collect()
}

fn pair(numbers: &[i64]) -> Option<(i64, i64)> {
    match numbers {
        [first, second] => Some((*first, *second)),
        _ => None,
    }
}

/// Sample standard deviation by Welford's one-pass update, truncated.
fn deviation(numbers: &[i64]) -> Option<i64> {
    if numbers.len() < 2 {
        return None;
    }
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (count, &n) in numbers.iter().enumerate() {
        let x = n as f64;
        let delta = x - mean;
        mean += delta / (count + 1) as f64;
        m2 += delta * (x - mean);
    }
    Some((m2 / (numbers.len() - 1) as f64).sqrt() as i64)
}

fn radix(n: i64, format: fn(u64) -> String) -> String {
    if n < 0 {
        format!("-{}", format(n.unsigned_abs()))
    } else {
        format(n as u64)
    }
}

/// Three decimals with trailing zeros removed.
fn decimal(x: f64) -> String {
    let text = format!("{:.3}", x);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_string() } else { text.to_string() }
}

fn logarithm(numbers: &[i64], log: fn(f64) -> f64) -> Vec<String> {
    numbers
        .iter()
        .filter(|&&n| n > 0)
        .map(|&n| decimal(log(n as f64)))
        .collect()
}

fn each(numbers: &[i64], convert: impl Fn(i64) -> String) -> Vec<String> {
    numbers.iter().map(|&n| convert(n)).collect()
}

/// Per-value arithmetic; values that overflow are dropped.
fn shifted(numbers: &[i64], step: impl Fn(i64) -> Option<i64>) -> Vec<String> {
    numbers
        .iter()
        .filter_map(|&n| step(n))
        .map(|n| n.to_string())
        .collect()
}

/// Sum of all values; `None` when empty or on overflow.
fn checked_sum(numbers: &[i64]) -> Option<i64> {
    if numbers.is_empty() {
        return None;
    }
    numbers.iter().try_fold(0i64, |total, &n| total.checked_add(n))
}

/// Truncated mean, summed wide so large inputs cannot overflow.
fn average(numbers: &[i64]) -> Option<i64> {
    if numbers.is_empty() {
        return None;
    }
    let total: i128 = numbers.iter().map(|&n| i128::from(n)).sum();
    i64::try_from(total / numbers.len() as i128).ok()
}

/// Apply a numeric extraction to the values gathered for one operation.
/// Non-numeric extractions yield nothing.
pub fn reduce(extraction: Extraction, values: &[String]) -> Vec<String> {
    let numbers = integers(values);
    let single =
        |value: Option<i64>| -> Vec<String> { value.map(|n| n.to_string()).into_iter().collect() };
    match extraction {
        Extraction::Num => each(&numbers, |n| n.to_string()),
        Extraction::Sum => single(checked_sum(&numbers)),
        Extraction::Min => single(numbers.iter().min().copied()),
        Extraction::Max => single(numbers.iter().max().copied()),
        Extraction::Avg => single(average(&numbers)),
        Extraction::Dev => single(deviation(&numbers)),
        Extraction::Med => {
            let mut sorted = numbers.clone();
            sorted.sort_unstable();
            single(sorted.get(sorted.len() / 2).copied())
        }
        Extraction::Acc => numbers
            .iter()
            .scan(0i64, |total, &n| {
                *total = total.checked_add(n)?;
                Some(total.to_string())
            })
            .collect(),
        Extraction::Sub => single(pair(&numbers).and_then(|(a, b)| a.checked_sub(b))),
        Extraction::Mul => single(pair(&numbers).and_then(|(a, b)| a.checked_mul(b))),
        Extraction::Div => single(pair(&numbers).and_then(|(a, b)| a.checked_div(b))),
        Extraction::Mod => single(pair(&numbers).and_then(|(a, b)| a.checked_rem(b))),
        Extraction::Inc => shifted(&numbers, |n| n.checked_add(1)),
        Extraction::Dec => shifted(&numbers, |n| n.checked_sub(1)),
        Extraction::Bin => each(&numbers, |n| radix(n, |u| format!("{:b}", u))),
        Extraction::Oct => each(&numbers, |n| radix(n, |u| format!("{:o}", u))),
        Extraction::Hex => each(&numbers, |n| radix(n, |u| format!("{:X}", u))),
        Extraction::Bit => each(&numbers, |n| n.unsigned_abs().count_ones().to_string()),
        Extraction::Pad => each(&numbers, |n| format!("{:08}", n)),
        Extraction::Log => logarithm(&numbers, f64::log10),
        Extraction::Ln => logarithm(&numbers, f64::ln),
        Extraction::Lg2 => logarithm(&numbers, f64::log2),
        _ => Vec::new(),
    }
}

/// True for the extractions `reduce` handles.
pub fn is_numeric(extraction: Extraction) -> bool {
    matches!(
        extraction,
        Extraction::Num
            | Extraction::Sum
            | Extraction::Min
            | Extraction::Max
            | Extraction::Avg
            | Extraction::Dev
            | Extraction::Med
            | Extraction::Acc
            | Extraction::Sub
            | Extraction::Mul
            | Extraction::Div
            | Extraction::Mod
            | Extraction::Inc
            | Extraction::Dec
            | Extraction::Bin
            | Extraction::Oct
            | Extraction::Hex
            | Extraction::Bit
            | Extraction::Pad
            | Extraction::Log
            | Extraction::Ln
            | Extraction::Lg2
    )
}
