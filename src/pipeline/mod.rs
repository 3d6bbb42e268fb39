pub mod import;
pub mod extraction;
pub mod processor; // Detect → extract → normalize orchestrator
pub mod prompt_templates;
pub mod assistant; // Completion collaborator (analysis + Q&A)
