use super::types::ResearchRequest;

/// Which output contract the model is asked to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Model proposes search queries; documents, links and profiles come from live search.
    LiveSearch,
    /// Model lists documents, links and profiles itself, with real URLs.
    Direct,
}

impl SourceMode {
    pub fn from_live_search(use_live_search: bool) -> Self {
        if use_live_search {
            SourceMode::LiveSearch
        } else {
            SourceMode::Direct
        }
    }
}

const LIVE_SEARCH_CONTRACT: &str = r#"{
    "content": "Detailed research summary ({word_count}+ words) covering the current state of research, key theories, methodologies, recent developments, open gaps, applications and conclusions. Academic in tone.",

    "video_search_queries": [
        "YouTube search query 1", "YouTube search query 2", "YouTube search query 3",
        "YouTube search query 4", "YouTube search query 5"
    ],

    "document_search_queries": [
        "Academic paper query 1", "Academic paper query 2", "Academic paper query 3",
        "Research report query 4", "Thesis or dissertation query 5"
    ],

    "web_search_queries": [
        "Organization or database query 1", "Research tool query 2", "Educational resource query 3",
        "Professional resource query 4", "Industry report query 5"
    ],

    "linkedin_search_queries": [
        "Expert researcher query 1", "Academic professional query 2", "Industry specialist query 3",
        "Research scientist query 4", "Professor query 5"
    ],

    "suggested_experts": [
        {
            "name": "Well-known expert in the field",
            "title": "Typical position",
            "institution": "Typical organization",
            "expertise": "Areas of expertise",
            "background": "Professional background",
            "relevance": "Why this person matters for the research",
            "search_terms": "Name + field + institution"
        }
    ],

    "suggested_sources": [
        {
            "title": "Academic source title",
            "authors": "Author list",
            "source": "Journal or publisher",
            "year": "Publication year",
            "description": "What the source covers",
            "type": "research_paper/report/thesis",
            "relevance": "Why it matters for the research",
            "search_terms": "Title + authors + keywords"
        }
    ]
}"#;

const DIRECT_CONTRACT: &str = r#"{
    "content": "Detailed research summary ({word_count}+ words) covering the current state of research, key theories, methodologies, recent developments, open gaps, applications and conclusions. Academic in tone.",

    "video_search_queries": [
        "YouTube search query 1", "YouTube search query 2", "YouTube search query 3",
        "YouTube search query 4", "YouTube search query 5"
    ],

    "documents": [
        {
            "title": "Paper, report or thesis title",
            "url": "Real, publicly accessible URL (arXiv, DOI, publisher or repository page)",
            "description": "What the document covers",
            "source": "Journal, publisher or repository",
            "type": "research_paper/report/thesis",
            "relevance": "Why it matters for the research"
        }
    ],

    "links": [
        {
            "title": "Resource name",
            "url": "Real, publicly accessible URL",
            "description": "What the resource offers",
            "source": "Organization or site",
            "type": "resource",
            "relevance": "Why it matters for the research"
        }
    ],

    "linkedin_profiles": [
        {
            "name": "Expert name",
            "linkedin_url": "Real LinkedIn profile URL",
            "title": "Current position",
            "institution": "Current organization",
            "description": "Background and expertise",
            "relevance": "Why this person matters for the research",
            "contact_potential": "High/Medium/Low"
        }
    ]
}"#;

/// Assemble the instruction sent to the model.
pub fn build_prompt(request: &ResearchRequest, user_context: &str, mode: SourceMode) -> String {
    let word_count = request.word_count;
    let level = request.academic_level;

    let (url_rule, contract, requirements) = match mode {
        SourceMode::LiveSearch => (
            "IMPORTANT: Do NOT generate fake URLs or links. Only provide titles, descriptions and search terms.",
            LIVE_SEARCH_CONTRACT,
            format!(
                "- Provide exactly 5 search queries in each *_search_queries array\n\
                 - Provide 6-8 suggested_experts and 6-8 suggested_sources\n\
                 - Use realistic but generic details (no specific URLs)\n\
                 - Keep all content appropriate for the {level} level\n\
                 - The content must be at least {word_count} words"
            ),
        ),
        SourceMode::Direct => (
            "IMPORTANT: Every URL must be real and publicly accessible. Omit an entry rather than guess its URL.",
            DIRECT_CONTRACT,
            format!(
                "- Provide exactly 5 video_search_queries\n\
                 - Provide 6-8 documents, 5 links and 5 linkedin_profiles\n\
                 - Keep all content appropriate for the {level} level\n\
                 - The content must be at least {word_count} words"
            ),
        ),
    };

    let contract = contract.replace("{word_count}", &word_count.to_string());

    format!(
        "You are an advanced research assistant. Generate comprehensive research content for: \"{topic}\"\n\
         \n\
         Context:\n\
         - Academic Level: {level}\n\
         - Research Area: {area}\n\
         - Keywords: {keywords}\n\
         - User: {user_context}\n\
         - Required Word Count: {word_count} words\n\
         \n\
         {url_rule}\n\
         \n\
         Return ONLY a valid JSON object with these exact keys:\n\
         \n\
         {contract}\n\
         \n\
         Requirements:\n\
         {requirements}\n\
         - Return ONLY the JSON object, no additional text",
        topic = request.topic,
        area = request.research_area,
        keywords = request.keywords,
    )
}
