//! Role directive resolver.
//!
//! Pure lookups from a [`Role`] to its behavior directive and display
//! metadata. Both functions are total over the closed role set: an unknown
//! role can only arise while parsing text, and that fails at the parse site.

mod directives;

use jurismind_types::role::{Role, RoleDisplayMetadata};

const LAWYER_META: RoleDisplayMetadata = RoleDisplayMetadata {
    title: "Legal Professional",
    description: "Advanced legal reasoning with case law analysis and structured arguments",
    features: &[
        "Structured legal reasoning blocks",
        "Statute and precedent references",
        "Case law analysis",
        "Exportable summaries",
    ],
    accent: "lawyer",
    icon: "Scale",
};

const CITIZEN_META: RoleDisplayMetadata = RoleDisplayMetadata {
    title: "Citizen",
    description: "Clear explanations of your legal rights and step-by-step guidance",
    features: &[
        "Simple language explanations",
        "Rights and duties explained",
        "Required documents checklist",
        "Next steps guidance",
    ],
    accent: "citizen",
    icon: "Users",
};

const STUDENT_META: RoleDisplayMetadata = RoleDisplayMetadata {
    title: "Law Student",
    description: "Educational content with exam-oriented explanations and concept breakdowns",
    features: &[
        "Concept explanations",
        "Case study breakdowns",
        "Exam preparation tips",
        "Legal principle highlights",
    ],
    accent: "student",
    icon: "GraduationCap",
};

/// The behavior directive sent as the system prompt for `role`.
pub fn directive_for(role: Role) -> &'static str {
    match role {
        Role::Lawyer => directives::LAWYER,
        Role::Citizen => directives::CITIZEN,
        Role::Student => directives::STUDENT,
    }
}

/// Card data shown for `role`.
pub fn metadata_for(role: Role) -> &'static RoleDisplayMetadata {
    match role {
        Role::Lawyer => &LAWYER_META,
        Role::Citizen => &CITIZEN_META,
        Role::Student => &STUDENT_META,
    }
}
