//! Response classification
//!
//! Reduces a [`ModelResponse`] to the single candidate the pipeline acts
//! on. Preference is fixed: any image beats any text, and text beats
//! nothing, regardless of where each sits in the candidate list.

use crate::models::{Candidate, ModelResponse};

pub fn classify(response: &ModelResponse) -> Candidate {
    response
        .candidates
        .iter()
        .find(|c| matches!(c, Candidate::Image(_)))
        .or_else(|| {
            response
                .candidates
                .iter()
                .find(|c| matches!(c, Candidate::Text(_)))
        })
        .cloned()
        .unwrap_or(Candidate::Empty)
}

/// First text candidate, even when the response also carries an image.
pub fn first_text(response: &ModelResponse) -> Option<&str> {
    response.candidates.iter().find_map(|c| match c {
        Candidate::Text(text) => Some(text.as_str()),
        _ => None,
    })
}
