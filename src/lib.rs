/*!
`csv-tokenizer` provides a streaming, pull-based tokenizer for CSV data that
has already been split into physical lines.

An upstream line reader (for example an `io::BufRead`-style decoder) splits
a byte stream into `String` lines and strips the terminators; this crate
turns that lazy sequence of lines into a lazy sequence of records, each
record an ordered sequence of field strings. The dialect is RFC 4180 with
pragmatic extensions seen in the wild: a configurable (optionally
multi-character) delimiter, optional quoting and escaping, optional
whitespace trimming of unquoted fields, a null marker string, comment lines,
a configurable line break for quoted fields that span physical lines, a size
bound on quoted fields, and a policy for stray quote characters.

The tokenizer interprets nothing: fields come back as the strings that were
on the wire, and deciding how many fields a record should have, or what a
field's bytes mean, is the caller's business. Malformed quoted fields raise
typed errors, and a partially tokenized record can be abandoned with
`skip_current_line`, which restores any speculatively consumed lines so
tokenizing resumes on the next physical line.

# Example: reading records

```
use csv_tokenizer::TokenizerBuilder;

# fn main() { example().unwrap(); }
fn example() -> Result<(), csv_tokenizer::Error> {
    let lines = vec![
        "city,country,pop".to_string(),
        "Boston,United States,4628910".to_string(),
        "Concord,\"United States\",42695".to_string(),
    ];
    let mut tok = TokenizerBuilder::new(",").build(lines.into_iter())?;

    let mut records = Vec::new();
    while tok.next_record()? {
        let mut record = Vec::new();
        while tok.has_next_column() {
            record.push(tok.next_column()?);
        }
        records.push(record);
    }
    assert_eq!(records, vec![
        vec!["city", "country", "pop"],
        vec!["Boston", "United States", "4628910"],
        vec!["Concord", "United States", "42695"],
    ]);
    Ok(())
}
```

# Example: recovering from a malformed record

```
use csv_tokenizer::TokenizerBuilder;

# fn main() { example().unwrap(); }
fn example() -> Result<(), csv_tokenizer::Error> {
    let lines = vec![
        "good,record".to_string(),
        "\"bad\"x,record".to_string(),
        "another,good".to_string(),
    ];
    let mut tok = TokenizerBuilder::new(",").build(lines.into_iter())?;

    let mut good = 0;
    let mut skipped = Vec::new();
    while tok.next_record()? {
        let mut ok = true;
        while tok.has_next_column() {
            if tok.next_column().is_err() {
                skipped.extend(tok.skip_current_line());
                ok = false;
                break;
            }
        }
        if ok {
            good += 1;
        }
    }
    assert_eq!(2, good);
    assert_eq!(vec!["\"bad\"x,record".to_string()], skipped);
    Ok(())
}
```
*/

#![deny(missing_docs)]

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::tokenizer::{
    Newline, QuotesInQuotedFields, Tokenizer, TokenizerBuilder,
};

mod error;
mod feed;
mod tokenizer;
