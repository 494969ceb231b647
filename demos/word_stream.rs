//! A word tokenizer driven from the outside with an enumerator.
//!
//! The tokenizer is written the plain way: it walks the text and calls a
//! callback for every word. The enumerator turns that into a stream the caller
//! pulls from, one word at a time.
//!
//! Key concepts demonstrated:
//! - Building an enumerator over a target with `Enumerator::builder()`
//! - `peek()` to look ahead without consuming
//! - `feed()` to answer the tokenizer's callback, here with a word's
//!   normalized spelling
//! - Derived enumerators: `with_index()` and `each_slice()`
//! - `rewind()` to start the traversal over
//!
//! Run with: `cargo run --example word_stream`

use std::sync::Arc;

use nexter::Enumerator;
use nexter::Error;

const TEXT: &str = "The quick brown fox\njumps over the lazy dog";

/// Calls `emit` for every whitespace-separated word, passing its line number.
/// Whatever `emit` returns for a word replaces it in the normalized output.
fn tokenize(
    text: &str,
    mut emit: impl FnMut(&str, usize) -> Option<String>,
) -> Vec<String> {
    let mut normalized = Vec::new();
    for (line, words) in text.lines().enumerate() {
        for word in words.split_whitespace() {
            let replacement = emit(word, line + 1);
            normalized.push(replacement.unwrap_or_else(|| word.to_owned()));
        }
    }
    normalized
}

fn words(
    text: Arc<String>,
) -> Enumerator<(String, usize), String, Vec<String>> {
    Enumerator::builder(text)
        .selector("each_word")
        .build(|text: &String, y| {
            Ok(tokenize(text, |word, line| {
                y.yield_value((word.to_owned(), line))
            }))
        })
}

fn main() {
    let text = Arc::new(String::from(TEXT));
    let e = words(text.clone());
    println!("{e}");

    // Pull the first line's words, lowercasing the capitalized one.
    while let Ok((word, line)) = e.peek() {
        if line > 1 {
            break;
        }
        e.next().ok();
        if word.chars().next().is_some_and(char::is_uppercase) {
            e.feed(word.to_lowercase()).ok();
        }
        println!("line {line}: {word}");
    }

    // Drain the rest; the traversal's return value arrives with exhaustion.
    loop {
        match e.next() {
            Ok((word, line)) => println!("line {line}: {word}"),
            Err(Error::Exhausted { result }) => {
                println!("normalized: {}", result.join(" "));
                break;
            }
            Err(err) => {
                eprintln!("tokenizer failed: {err}");
                return;
            }
        }
    }

    // Start over and look at the stream through derived enumerators.
    e.rewind();
    let numbered = e.with_index(1);
    while let Ok(((word, _), n)) = numbered.next() {
        println!("{n:>2}. {word}");
    }

    let mut groups = 0;
    e.for_each_slice(3, |group| {
        groups += 1;
        let words: Vec<&str> = group.iter().map(|(w, _)| w.as_str()).collect();
        println!("{}", words.join(" "));
    })
    .ok();
    println!("{groups} groups of up to three");
}
