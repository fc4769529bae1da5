// Prompt text, response schemas and structured-output parsing.

use folio_common::types::{BookIdea, Chapter};
use serde::Deserialize;
use serde_json::{json, Value};

use super::GenerationError;

pub const IDEA_COUNT: usize = 3;
pub const OUTLINE_CHAPTERS: usize = 12;
pub const PLOT_CONSISTENCY: &str = "Plot Consistency";

/// Aspects offered by the analysis panel.
pub const ANALYSIS_ASPECTS: &[&str] =
    &["Pacing", "Character Development", "Dialogue", "Tone", PLOT_CONSISTENCY];

pub fn ideas_prompt(genre: &str) -> String {
    format!(
        "Generate {IDEA_COUNT} unique book ideas in the {genre} genre. For each idea, provide a \
         compelling title and a one-paragraph synopsis."
    )
}

pub fn ideas_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING", "description": "The title of the book idea." },
                "synopsis": {
                    "type": "STRING",
                    "description": "A one-paragraph synopsis of the book idea."
                }
            },
            "required": ["title", "synopsis"]
        }
    })
}

pub fn outline_prompt(title: &str, synopsis: &str) -> String {
    format!(
        "Given the book title \"{title}\" and synopsis \"{synopsis}\", generate a list of \
         {OUTLINE_CHAPTERS} chapter titles that outline a coherent story arc. For each chapter, \
         provide a one-sentence description of its content."
    )
}

pub fn outline_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "chapterTitle": { "type": "STRING", "description": "The title of the chapter." },
                "chapterDescription": {
                    "type": "STRING",
                    "description": "A one-sentence description of the chapter."
                }
            },
            "required": ["chapterTitle", "chapterDescription"]
        }
    })
}

pub fn chapter_prompt(
    book_title: &str,
    book_synopsis: &str,
    chapter_title: &str,
    chapter_description: &str,
) -> String {
    format!(
        "You are a creative writer. Based on the book titled \"{book_title}\" with the synopsis \
         \"{book_synopsis}\", write the content for the chapter titled \"{chapter_title}\".\n\
         The chapter should focus on: \"{chapter_description}\".\n\
         Write a compelling and engaging chapter of about 500-700 words. Use rich descriptions \
         and advance the plot.\n\
         Output the content in markdown format."
    )
}

/// Context used when the plot-consistency aspect is requested.
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext<'a> {
    pub book_synopsis: &'a str,
    pub chapter_description: &'a str,
}

pub fn analyze_prompt(text: &str, aspects: &[String], context: &AnalysisContext<'_>) -> String {
    let mut prompt = format!(
        "Analyze the following text for {}. Provide a brief, constructive summary of your \
         analysis for each aspect in markdown format.",
        join_aspects(aspects)
    );
    if aspects.iter().any(|aspect| aspect == PLOT_CONSISTENCY) {
        prompt.push_str(&format!(
            "\n\nWhen analyzing for Plot Consistency, use the following context:\n\
             - Book Synopsis: \"{}\"\n\
             - Chapter Description: \"{}\"",
            context.book_synopsis, context.chapter_description
        ));
    }
    prompt.push_str(&fenced("Text to analyze", text));
    prompt
}

pub fn suggest_edits_prompt(text: &str) -> String {
    let mut prompt = String::from(
        "You are an expert editor. Proofread the following text. Suggest edits to improve \
         grammar, spelling, and flow. Present the suggestions clearly using markdown for emphasis \
         (e.g., bold for additions, strikethrough for deletions).",
    );
    prompt.push_str(&fenced("Text to edit", text));
    prompt
}

pub fn humanize_prompt(text: &str) -> String {
    let mut prompt = String::from(
        "Rewrite the following chapter so it reads as if a skilled human author wrote it. Vary \
         sentence length, prefer concrete detail over abstraction, and remove stock phrasing. \
         Keep the plot, characters and markdown structure intact. Return only the rewritten \
         chapter.",
    );
    prompt.push_str(&fenced("Chapter", text));
    prompt
}

pub fn grammar_prompt(text: &str) -> String {
    let mut prompt = String::from(
        "Correct the grammar, spelling and punctuation of the following text. Do not change its \
         meaning, voice or markdown formatting. Return only the corrected text.",
    );
    prompt.push_str(&fenced("Text", text));
    prompt
}

pub fn cover_prompt(title: &str, synopsis: &str, genre: &str) -> String {
    format!(
        "A book cover illustration for a {genre} novel titled \"{title}\". {synopsis} \
         Painterly, evocative, no text or lettering."
    )
}

/// "a", "a and b", "a, b, and c".
pub fn join_aspects(aspects: &[String]) -> String {
    match aspects {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}

fn fenced(label: &str, text: &str) -> String {
    format!("\n\n{label}:\n---\n{text}\n---")
}

#[derive(Debug, Deserialize)]
struct RawIdea {
    title: String,
    synopsis: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChapter {
    chapter_title: String,
    chapter_description: String,
}

/// Parse structured idea output and assign fresh ids.
pub fn parse_ideas(raw: &str) -> Result<Vec<BookIdea>, GenerationError> {
    let ideas: Vec<RawIdea> = parse_json(raw)?;
    Ok(ideas.into_iter().map(|idea| BookIdea::new(idea.title, idea.synopsis)).collect())
}

/// Parse structured outline output and assign fresh ids.
pub fn parse_outline(raw: &str) -> Result<Vec<Chapter>, GenerationError> {
    let chapters: Vec<RawChapter> = parse_json(raw)?;
    Ok(chapters
        .into_iter()
        .map(|chapter| Chapter::new(chapter.chapter_title, chapter.chapter_description))
        .collect())
}

fn parse_json<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<T, GenerationError> {
    let trimmed = strip_code_fence(raw.trim());
    serde_json::from_str(trimmed)
        .map_err(|error| GenerationError::Failure(format!("unexpected response format: {error}")))
}

// Models occasionally wrap structured output in a ```json fence.
fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    let body = rest.trim_start_matches("json");
    body.strip_suffix("```").unwrap_or(body).trim()
}
