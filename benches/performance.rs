use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use quire_tui::{
    document::{Document, Leaf, ListKind, Mark, Marks, TextKind},
    editor::{Command, Editor, EditorState, apply},
    html,
    render::render_document,
};
use ratatui::style::Style;
use std::time::{Duration, Instant};

/// Performance benchmark suite for quire editor operations
///
/// Run with: cargo test --release --bench performance -- --nocapture
///
/// This measures:
/// - Document rendering performance
/// - HTML serialization and parsing
/// - Typing through the editor adapter
/// - Formatting a whole document
const SMALL_DOC_PARAGRAPHS: usize = 10;
const MEDIUM_DOC_PARAGRAPHS: usize = 100;
const LARGE_DOC_PARAGRAPHS: usize = 1000;

const ITERATIONS: usize = 100;

const SAMPLE_WORDS: &[&str] = &[
    "Lorem",
    "ipsum",
    "dolor",
    "sit",
    "amet",
    "consectetur",
    "adipiscing",
    "elit",
    "sed",
    "do",
    "eiusmod",
    "tempor",
    "incididunt",
    "ut",
    "labore",
    "et",
    "dolore",
    "magna",
    "aliqua",
];

/// Create a test document mixing headings, paragraphs, quotes and lists
fn create_test_document(num_paragraphs: usize, avg_words_per_para: usize) -> Document {
    let mut doc = Document::empty();

    for i in 0..num_paragraphs {
        let text = (0..avg_words_per_para)
            .map(|word| SAMPLE_WORDS[(i + word) % SAMPLE_WORDS.len()])
            .collect::<Vec<_>>()
            .join(" ");

        if i % 10 == 0 {
            doc.push_block(TextKind::HeadingOne, vec![Leaf::plain(format!("Section {i}"))]);
        }
        match i % 7 {
            3 => {
                doc.push_list(
                    ListKind::Bulleted,
                    vec![vec![Leaf::plain(text.clone())], vec![Leaf::plain(text)]],
                );
            }
            5 => {
                doc.push_block(TextKind::BlockQuote, vec![Leaf::plain(text)]);
            }
            _ => {
                let mid = text.len() / 2;
                let (head, tail) = text.split_at(mid);
                doc.push_block(
                    TextKind::Paragraph,
                    vec![
                        Leaf::plain(head),
                        Leaf::new(tail, Marks::of(&[Mark::Bold, Mark::Italic])),
                    ],
                );
            }
        }
    }

    doc
}

struct BenchmarkResult {
    name: String,
    iterations: usize,
    total_duration: Duration,
    avg_duration: Duration,
    min_duration: Duration,
    max_duration: Duration,
}

impl BenchmarkResult {
    fn print(&self) {
        println!("\n{}", "=".repeat(70));
        println!("Benchmark: {}", self.name);
        println!("{}", "=".repeat(70));
        println!("Iterations:     {}", self.iterations);
        println!("Total time:     {:?}", self.total_duration);
        println!("Average:        {:?}", self.avg_duration);
        println!("Min:            {:?}", self.min_duration);
        println!("Max:            {:?}", self.max_duration);
        println!(
            "Ops/sec:        {:.2}",
            1_000_000.0 / self.avg_duration.as_micros().max(1) as f64
        );

        if self.avg_duration.as_millis() > 100 {
            println!("\n⚠️  WARNING: Average duration > 100ms (user-perceptible lag)");
        } else if self.avg_duration.as_millis() > 16 {
            println!("\n⚠️  WARNING: Average duration > 16ms (may drop frames)");
        }
    }
}

fn benchmark<F>(name: &str, iterations: usize, mut f: F) -> BenchmarkResult
where
    F: FnMut(),
{
    let mut durations = Vec::with_capacity(iterations);

    // Warmup
    for _ in 0..10 {
        f();
    }

    for _ in 0..iterations {
        let start = Instant::now();
        f();
        durations.push(start.elapsed());
    }

    let total_duration: Duration = durations.iter().sum();
    let avg_duration = total_duration / iterations as u32;
    let min_duration = *durations.iter().min().unwrap();
    let max_duration = *durations.iter().max().unwrap();

    BenchmarkResult {
        name: name.to_string(),
        iterations,
        total_duration,
        avg_duration,
        min_duration,
        max_duration,
    }
}

fn sizes() -> Vec<(&'static str, Document)> {
    vec![
        ("Small", create_test_document(SMALL_DOC_PARAGRAPHS, 20)),
        ("Medium", create_test_document(MEDIUM_DOC_PARAGRAPHS, 30)),
        ("Large", create_test_document(LARGE_DOC_PARAGRAPHS, 30)),
    ]
}

#[test]
fn bench_rendering_performance() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           RENDERING PERFORMANCE BENCHMARKS                     ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (label, doc) in sizes() {
        for width in [40, 80, 120] {
            let result = benchmark(
                &format!("Render {label} document at width {width}"),
                ITERATIONS,
                || {
                    let _ = render_document(&doc, None, width, Style::default());
                },
            );
            result.print();
        }
    }
}

#[test]
fn bench_rendering_with_selection() {
    let doc = create_test_document(MEDIUM_DOC_PARAGRAPHS, 30);
    let state = apply(&EditorState::new(doc), &Command::SelectAll);

    let result = benchmark("Render medium document fully selected", ITERATIONS, || {
        let _ = render_document(&state.document, Some(&state.selection), 80, Style::default());
    });
    result.print();
}

#[test]
fn bench_html_round_trip() {
    for (label, doc) in sizes() {
        let serialized = html::serialize(&doc);

        let result = benchmark(&format!("Serialize {label} document"), ITERATIONS, || {
            let _ = html::serialize(&doc);
        });
        result.print();

        let result = benchmark(&format!("Parse {label} document"), ITERATIONS, || {
            let _ = html::deserialize(&serialized);
        });
        result.print();
    }
}

#[test]
fn bench_editing_insert_text() {
    let doc = create_test_document(MEDIUM_DOC_PARAGRAPHS, 30);
    let key = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);

    let result = benchmark("Type one character into medium document", ITERATIONS, || {
        let mut editor = Editor::from_document(doc.clone());
        editor.handle_key(&key);
    });
    result.print();

    let mut editor = Editor::from_document(doc.clone());
    let result = benchmark("Type 100 characters with history", 10, || {
        for _ in 0..100 {
            editor.handle_key(&key);
        }
    });
    result.print();
}

#[test]
fn bench_full_edit_cycle() {
    let doc = create_test_document(MEDIUM_DOC_PARAGRAPHS, 30);
    let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
    let backspace = KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE);

    let result = benchmark("Split, join and render", ITERATIONS, || {
        let mut editor = Editor::from_document(doc.clone());
        editor.handle_key(&enter);
        editor.handle_key(&backspace);
        let _ = render_document(editor.document(), Some(&editor.selection()), 80, Style::default());
    });
    result.print();
}

#[test]
fn bench_formatting_whole_document() {
    for (label, doc) in sizes() {
        let state = apply(&EditorState::new(doc), &Command::SelectAll);
        let result = benchmark(&format!("Toggle underline on {label} document"), 20, || {
            let _ = apply(&state, &Command::ToggleMark(Mark::Underline));
        });
        result.print();
    }
}
