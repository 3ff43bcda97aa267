//! Nucleotide and protein sequence helpers.

/// IUPAC nucleotide complement; case is preserved, unknown symbols pass through.
fn complement(base: char) -> char {
    let flipped = match base.to_ascii_uppercase() {
        'A' => 'T',
        'T' | 'U' => 'A',
        'C' => 'G',
        'G' => 'C',
        'R' => 'Y',
        'Y' => 'R',
        'K' => 'M',
        'M' => 'K',
        'B' => 'V',
        'V' => 'B',
        'D' => 'H',
        'H' => 'D',
        other => other,
    };
    if base.is_ascii_lowercase() {
        flipped.to_ascii_lowercase()
    } else {
        flipped
    }
}

pub fn reverse_complement(sequence: &str) -> String {
    sequence.chars().rev().map(complement).collect()
}

/// Lay a sequence out in lines of 50 residues.
pub fn fasta(sequence: &str) -> String {
    let residues: Vec<char> = sequence.chars().filter(|c| !c.is_whitespace()).collect();
    residues
        .chunks(50)
        .map(|line| line.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

fn hex_nibbles(packed: &str) -> Option<Vec<u8>> {
    packed
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect()
}

/// Expand hex-encoded 2-bit packed bases (`00`=A `01`=C `10`=G `11`=T).
/// `length`, when known, drops the padding bases of the last byte.
pub fn ncbi2na(packed: &str, length: Option<usize>) -> Option<String> {
    const BASES: [char; 4] = ['A', 'C', 'G', 'T'];
    let mut out = String::new();
    for nibble in hex_nibbles(packed)? {
        out.push(BASES[(nibble >> 2) as usize & 3]);
        out.push(BASES[nibble as usize & 3]);
    }
    if let Some(length) = length {
        out.truncate(length);
    }
    Some(out)
}

/// Expand hex-encoded 4-bit IUPAC codes, one base per nibble.
pub fn ncbi4na(packed: &str, length: Option<usize>) -> Option<String> {
    const CODES: [char; 16] = [
        '-', 'A', 'C', 'M', 'G', 'R', 'S', 'V', 'T', 'W', 'Y', 'H', 'K', 'D', 'B', 'N',
    ];
    let mut out: String = hex_nibbles(packed)?
        .into_iter()
        .map(|nibble| CODES[nibble as usize])
        .collect();
    if let Some(length) = length {
        out.truncate(length);
    }
    Some(out)
}

/// Average residue masses in daltons, without water.
fn residue_mass(code: char) -> Option<f64> {
    let mass = match code.to_ascii_uppercase() {
        'A' => 71.0788,
        'R' => 156.1875,
        'N' => 114.1038,
        'D' => 115.0886,
        'C' => 103.1388,
        'E' => 129.1155,
        'Q' => 128.1307,
        'G' => 57.0519,
        'H' => 137.1411,
        'I' => 113.1594,
        'L' => 113.1594,
        'K' => 128.1741,
        'M' => 131.1926,
        'F' => 147.1766,
        'P' => 97.1167,
        'S' => 87.0782,
        'T' => 101.1051,
        'W' => 186.2132,
        'Y' => 163.1760,
        'V' => 99.1326,
        'U' => 150.0388,
        'O' => 237.3018,
        _ => return None,
    };
    Some(mass)
}

const WATER: f64 = 18.01524;

/// Peptide molecular weight, rounded to whole daltons. An initial
/// methionine is removed, matching the mature protein.
pub fn molecular_weight(peptide: &str) -> Option<u64> {
    let residues: Vec<char> = peptide
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect();
    let residues = match residues.split_first() {
        Some((&('M' | 'm'), rest)) if !rest.is_empty() => rest,
        _ => &residues[..],
    };
    if residues.is_empty() {
        return None;
    }
    let mut total = WATER;
    for &code in residues {
        total += residue_mass(code)?;
    }
    Some(total.round() as u64)
}

/// Break an HGVS variant such as `NM_000546.5:c.215C>G` into labeled fields.
pub fn hgvs(expression: &str) -> Option<String> {
    let (accession, change) = expression.trim().split_once(':')?;
    let (kind, rest) = change.split_once('.')?;
    if accession.is_empty() || kind.is_empty() {
        return None;
    }

    let rest = rest.trim_start_matches('(').trim_end_matches(')');
    let digits_end = rest
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '_' | '+' | '-' | '*')))
        .unwrap_or(rest.len());
    let (position, edit) = rest.split_at(digits_end);

    let mut out = format!(
        "<Variant><Accession>{}</Accession><Type>{}</Type>",
        accession, kind
    );
    if !position.is_empty() {
        out.push_str(&format!("<Position>{}</Position>", position));
    }
    if let Some((deleted, inserted)) = edit.split_once('>') {
        out.push_str(&format!(
            "<Deleted>{}</Deleted><Inserted>{}</Inserted>",
            deleted, inserted
        ));
    } else if let Some(kind) = ["delins", "del", "ins", "dup", "inv", "fs"]
        .iter()
        .find(|kind| edit.starts_with(*kind))
    {
        let residues = &edit[kind.len()..];
        out.push_str(&format!("<Change>{}</Change>", kind));
        if !residues.is_empty() {
            out.push_str(&format!("<Residues>{}</Residues>", residues));
        }
    } else if !edit.is_empty() {
        out.push_str(&format!("<Change>{}</Change>", edit));
    }
    out.push_str("</Variant>");
    Some(out)
}
