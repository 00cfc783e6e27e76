//! Prompt templates for the pipeline stages

use crate::analysis::{LandmarkCandidate, LandmarkReport};
use crate::contract::ContractError;
use crate::core::question::Exchange;
use crate::image::ImageBatch;

/// Sentinel a question stage model answers with when it has nothing left to ask
pub const NO_MORE_QUESTIONS: &str = "NO_MORE_QUESTIONS";

/// Templates for generating prompts at each stage
pub struct StagePromptTemplate;

impl StagePromptTemplate {
    /// One line per image: batch index, handle and any caller metadata.
    pub fn image_listing(batch: &ImageBatch, indices: &[usize]) -> String {
        let mut listing = String::new();
        for &i in indices {
            let (Some(image), Some(meta)) = (batch.image(i), batch.metadata(i)) else {
                continue;
            };
            listing.push_str(&format!("[{}] {}", i, image));
            let mut facts = Vec::new();
            if let Some(ts) = &meta.timestamp {
                facts.push(format!("taken {}", ts));
            }
            if let Some(loc) = &meta.location {
                facts.push(format!("GPS {}", loc));
            }
            for (key, value) in &meta.exif {
                facts.push(format!("{}={}", key, value));
            }
            if !facts.is_empty() {
                listing.push_str(&format!(" ({})", facts.join(", ")));
            }
            listing.push('\n');
        }
        listing
    }

    fn with_note(mut prompt: String, note: Option<&str>) -> String {
        if let Some(note) = note.filter(|n| !n.trim().is_empty()) {
            prompt.push_str(&format!("\nAdditional guidance: {}\n", note.trim()));
        }
        prompt
    }

    pub fn selection_system(max_selected: usize) -> String {
        format!(
            r#"You curate travel photos. Group near-duplicate shots, keep the best of each group,
and choose at most {} photos that together tell the most interesting story.
Refer to photos only by their bracketed 0-based index.
Reply with JSON: {{"selected_indices": [..], "reasons": "..."}}."#,
            max_selected
        )
    }

    pub fn selection_prompt(batch: &ImageBatch, note: Option<&str>) -> String {
        let prompt = format!(
            "The batch contains {} photos (attached in this order):\n{}",
            batch.len(),
            Self::image_listing(batch, &batch.all_indices())
        );
        Self::with_note(prompt, note)
    }

    pub fn landmark_candidates_system() -> &'static str {
        r#"You spot landmarks, historic sites and notable places in travel photos.
For every photo that shows one, describe it briefly and write a web search query
that would confirm what it is and where it is.
Reply with JSON: {"candidates": [{"image_index": n, "description": "...", "search_query": "..."}]}."#
    }

    pub fn landmark_candidates_prompt(
        batch: &ImageBatch,
        targets: &[usize],
        note: Option<&str>,
    ) -> String {
        let prompt = format!(
            "Photos to inspect (attached in this order):\n{}",
            Self::image_listing(batch, targets)
        );
        Self::with_note(prompt, note)
    }

    /// Second landmark pass: compose findings from the search evidence.
    pub fn landmark_report_prompt(evidence: &[(LandmarkCandidate, Vec<String>)]) -> String {
        let mut prompt = String::from(
            r#"Search results for the candidate landmarks follow. Using only what the results
support, write one finding per confirmed landmark with its name, region and why it matters.
Key each finding by image_index, or by location when it describes a place rather than a photo.
Reply with JSON: {"summary": "...", "findings": [{"image_index": n, "text": "...", "name": "...", "region": "...", "significance": "..."}]}.
"#,
        );
        for (candidate, snippets) in evidence {
            prompt.push_str(&format!(
                "\n--- photo [{}]: {} (query: {}) ---\n",
                candidate.image_index, candidate.description, candidate.search_query
            ));
            if snippets.is_empty() {
                prompt.push_str("(no results)\n");
            }
            for snippet in snippets {
                prompt.push_str(&format!("- {}\n", snippet));
            }
        }
        prompt
    }

    pub fn extraction_system() -> &'static str {
        r#"You analyse travel photos. For each photo give its path, the capture time as an
ISO-8601 timestamp if known, its GPS location if known, and the recognisable subjects
(landmarks, nature, activities, people, food, architecture). Unknown values are null;
never guess coordinates. Then write a one or two sentence preliminary story of the trip.
Describe the photos in exactly the order given.
Reply with JSON: {"images": [{"path": "...", "timestamp": "...", "location": {"lat": x, "lng": y}, "subjects": [..]}], "preliminary_story": "..."}."#
    }

    pub fn extraction_prompt(
        batch: &ImageBatch,
        targets: &[usize],
        landmarks: Option<&LandmarkReport>,
        note: Option<&str>,
    ) -> String {
        let mut prompt = format!(
            "Photos (attached in this order):\n{}",
            Self::image_listing(batch, targets)
        );
        if let Some(report) = landmarks {
            let relevant: Vec<_> = report
                .findings
                .iter()
                .filter(|f| match f.subject {
                    crate::analysis::FindingSubject::Image { index } => targets.contains(&index),
                    crate::analysis::FindingSubject::Location { .. } => true,
                })
                .collect();
            if !relevant.is_empty() {
                prompt.push_str("\nVerified landmark information:\n");
                for finding in relevant {
                    let label = match finding.subject {
                        crate::analysis::FindingSubject::Image { index } => format!("[{}]", index),
                        crate::analysis::FindingSubject::Location { location } => {
                            format!("near {}", location)
                        }
                    };
                    let name = finding.name.as_deref().unwrap_or("unnamed");
                    prompt.push_str(&format!("- {} {}: {}\n", label, name, finding.text));
                }
            }
        }
        Self::with_note(prompt, note)
    }

    pub fn question_system() -> &'static str {
        r#"You help a traveller turn photos into a blog post. Ask the traveller one short,
specific question about the context, people, places or feelings behind the photos.
Ask exactly one question per reply and nothing else."#
    }

    pub fn next_question_prompt(story: &str, exchanges: &[Exchange], note: Option<&str>) -> String {
        let mut prompt = format!("Current story draft:\n{}\n", story);
        if !exchanges.is_empty() {
            prompt.push_str("\nAlready asked:\n");
            for exchange in exchanges {
                prompt.push_str(&format!(
                    "Q: {}\nA: {}\n",
                    exchange.question.content(),
                    exchange.answer
                ));
            }
        }
        prompt.push_str(&format!(
            "\nAsk the next question, or reply {} if the story needs nothing more.\n",
            NO_MORE_QUESTIONS
        ));
        Self::with_note(prompt, note)
    }

    pub fn refine_story_prompt(story: &str, exchanges: &[Exchange]) -> String {
        let mut prompt = format!(
            "Rewrite this travel story using the traveller's answers. Keep it factual.\n\nStory:\n{}\n\nAnswers:\n",
            story
        );
        for exchange in exchanges {
            prompt.push_str(&format!(
                "Q: {}\nA: {}\n",
                exchange.question.content(),
                exchange.answer
            ));
        }
        prompt
    }

    pub fn root_system() -> &'static str {
        r#"You receive a batch of travel photos and help turn them into a travel blog.
You may call the tools available to you, in any order and as often as useful:
select a subset, verify landmarks, extract data, and ask the traveller questions.
When you are done, reply with the blog draft as plain text."#
    }

    pub fn root_prompt(batch: &ImageBatch, note: Option<&str>) -> String {
        let prompt = format!(
            "Photos in this batch:\n{}",
            Self::image_listing(batch, &batch.all_indices())
        );
        Self::with_note(prompt, note)
    }

    /// Re-prompt after a contract violation.
    pub fn contract_repair_prompt(contract: &str, error: &ContractError) -> String {
        format!(
            "Your previous reply did not match the required {} format: {}.\nReply again with corrected JSON only.",
            contract, error
        )
    }
}
