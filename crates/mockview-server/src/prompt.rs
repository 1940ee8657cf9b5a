//! Interviewer persona text.

use mockview_types::Language;

/// Synthetic candidate line that asks the interviewer for closing
/// feedback. Sent to the model when an interview ends, never stored.
pub const CLOSING_PROMPT: &str = "That is the end of the mock interview, thank you, please \
provide your feedbacks on my strength and which area to improve, and whether you are \
confident that I fits the role.";

/// Builds the system turn that sets up the interviewer persona.
pub fn system_prompt(role: &str, skills: &[String], language: Language) -> String {
    let skills: Vec<&str> = skills
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    let skills = if skills.is_empty() {
        "general skills relevant to the position".to_string()
    } else {
        skills.join(", ")
    };

    format!(
        "You are an experienced interviewer conducting a mock job interview for a {role} \
         position. The candidate claims these skills: {skills}. Ask one question at a time, \
         follow up on the candidate's answers, and keep each reply short enough to be spoken \
         aloud. Do not use lists, headings, or other formatting. Conduct the entire interview \
         in {language} ({native}). When the candidate ends the interview, give honest \
         feedback on their strengths, the areas to improve, and whether they fit the role.",
        role = role.trim(),
        language = english_name(language),
        native = language.native_name(),
    )
}

/// The interviewer's first line, in the session language.
pub fn opening_line(role: &str, language: Language) -> String {
    let role = role.trim();
    match language {
        Language::English => format!(
            "Hello, thank you for joining this interview for the {role} position. \
             To start, could you briefly introduce yourself?"
        ),
        Language::Indonesian => format!(
            "Halo, terima kasih telah mengikuti wawancara untuk posisi {role}. \
             Untuk memulai, bisakah Anda memperkenalkan diri secara singkat?"
        ),
        Language::Spanish => format!(
            "Hola, gracias por asistir a esta entrevista para el puesto de {role}. \
             Para empezar, ¿podría presentarse brevemente?"
        ),
        Language::French => format!(
            "Bonjour, merci de participer à cet entretien pour le poste de {role}. \
             Pour commencer, pourriez-vous vous présenter brièvement ?"
        ),
        Language::German => format!(
            "Hallo, vielen Dank, dass Sie an diesem Vorstellungsgespräch für die Position \
             {role} teilnehmen. Könnten Sie sich zu Beginn kurz vorstellen?"
        ),
        Language::Japanese => format!(
            "こんにちは。{role}のポジションの面接にご参加いただきありがとうございます。\
             まずは簡単に自己紹介をお願いできますか？"
        ),
    }
}

fn english_name(language: Language) -> &'static str {
    match language {
        Language::English => "English",
        Language::Indonesian => "Indonesian",
        Language::Spanish => "Spanish",
        Language::French => "French",
        Language::German => "German",
        Language::Japanese => "Japanese",
    }
}
