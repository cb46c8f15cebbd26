//! Delimiter detection for marketplace exports.

/// Delimiters tried when sniffing, in tie-break order.
pub const CANDIDATE_DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Guess the delimiter of `sample`.
///
/// A candidate qualifies when it appears the same, non-zero number of times
/// (outside quotes) on every sampled line; the highest count wins. Falls back
/// to the most frequent candidate on the header line, then to `,`.
pub fn sniff_delimiter(sample: &str) -> char {
    let lines: Vec<&str> = sample
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();
    // The last line of a truncated sample may be cut mid-record.
    let lines = if lines.len() > 2 {
        &lines[..lines.len() - 1]
    } else {
        &lines[..]
    };

    let Some(header) = lines.first() else {
        return ',';
    };

    let mut best: Option<(char, usize)> = None;
    for delimiter in CANDIDATE_DELIMITERS {
        let count = count_unquoted(header, delimiter);
        if count == 0 {
            continue;
        }
        let consistent = lines
            .iter()
            .all(|line| count_unquoted(line, delimiter) == count);
        if consistent && best.map_or(true, |(_, c)| count > c) {
            best = Some((delimiter, count));
        }
    }

    if let Some((delimiter, _)) = best {
        return delimiter;
    }

    CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .map(|d| (d, count_unquoted(header, d)))
        .filter(|(_, c)| *c > 0)
        .fold(None, |acc: Option<(char, usize)>, (d, c)| match acc {
            Some((_, best_count)) if best_count >= c => acc,
            _ => Some((d, c)),
        })
        .map(|(d, _)| d)
        .unwrap_or(',')
}

fn count_unquoted(line: &str, delimiter: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for c in line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}
