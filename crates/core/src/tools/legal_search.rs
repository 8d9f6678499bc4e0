//! # Legal Search
//!
//! Keyword search over a small embedded statute corpus. No vector store:
//! each query token is scored against a chunk's keywords (3), title (2) and
//! body (1), and the best `top_k` chunks win.

use serde::{Deserialize, Serialize};

/// One article of a statute
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalChunk {
    pub id: &'static str,
    pub law: &'static str,
    pub article: &'static str,
    pub title: &'static str,
    pub content: &'static str,
    pub keywords: &'static [&'static str],
    pub related_articles: &'static [&'static str],
}

impl LegalChunk {
    /// `Basis: <law> <article> (<title>)`
    pub fn format_citation(&self) -> String {
        format!("Basis: {} {} ({})", self.law, self.article, self.title)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    High,
    Medium,
}

/// Citation as published to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LegalCitation {
    pub law_name: String,
    pub article: String,
    pub content: String,
    pub relevance: Relevance,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: &'static LegalChunk,
    pub score: u32,
    pub matched_keywords: Vec<String>,
}

impl SearchHit {
    pub fn to_citation(&self) -> LegalCitation {
        LegalCitation {
            law_name: self.chunk.law.to_string(),
            article: self.chunk.article.to_string(),
            content: self.chunk.content.to_string(),
            relevance: if self.score >= HIGH_RELEVANCE_SCORE {
                Relevance::High
            } else {
                Relevance::Medium
            },
        }
    }
}

const KEYWORD_WEIGHT: u32 = 3;
const TITLE_WEIGHT: u32 = 2;
const CONTENT_WEIGHT: u32 = 1;
const HIGH_RELEVANCE_SCORE: u32 = 5;

static CORPUS: &[LegalChunk] = &[
    LegalChunk {
        id: "food-36",
        law: "Food Sanitation Act",
        article: "Article 36",
        title: "Facility standards",
        content: "A person who intends to run a restaurant business shall install a kitchen, restroom and other facilities meeting the standards set by Ordinance.",
        keywords: &["식당", "음식점", "시설기준", "restaurant", "kitchen", "facility"],
        related_articles: &["food-37"],
    },
    LegalChunk {
        id: "food-37",
        law: "Food Sanitation Act",
        article: "Article 37",
        title: "Business permits and reports",
        content: "A person who intends to run a general restaurant business shall report to the head of the local government before opening.",
        keywords: &["영업허가", "영업신고", "식당", "음식점", "permit", "business report", "restaurant"],
        related_articles: &["food-36", "food-41"],
    },
    LegalChunk {
        id: "food-41",
        law: "Food Sanitation Act",
        article: "Article 41",
        title: "Food sanitation education",
        content: "A person who intends to run a food service business shall complete food sanitation education in advance.",
        keywords: &["위생교육", "식품위생", "education", "hygiene", "sanitation"],
        related_articles: &["food-37"],
    },
    LegalChunk {
        id: "building-19",
        law: "Building Act",
        article: "Article 19",
        title: "Change of building use",
        content: "A person who intends to change the use of a building shall obtain permission or report, depending on the facility group of the new use.",
        keywords: &["건축물", "용도변경", "building", "use change", "근린생활시설"],
        related_articles: &["building-38"],
    },
    LegalChunk {
        id: "building-38",
        law: "Building Act",
        article: "Article 38",
        title: "Building register",
        content: "The head of a local government shall keep a building register recording the use, floor area and approval date of each building.",
        keywords: &["건축물대장", "건축물", "building register", "registry", "floor area"],
        related_articles: &["building-19"],
    },
    LegalChunk {
        id: "resident-10",
        law: "Resident Registration Act",
        article: "Article 10",
        title: "Move-in report",
        content: "A resident who moves to a new address shall report the move-in within 14 days. The head of household may report on behalf of members.",
        keywords: &["전입", "전입신고", "이사", "move-in", "relocation", "moving", "address"],
        related_articles: &["resident-40"],
    },
    LegalChunk {
        id: "resident-40",
        law: "Resident Registration Act",
        article: "Article 40",
        title: "Administrative fines",
        content: "A person who fails to report a move-in within the period shall be subject to an administrative fine of up to 50,000 won.",
        keywords: &["과태료", "전입", "fine", "late report", "relocation"],
        related_articles: &["resident-10"],
    },
    LegalChunk {
        id: "civil-12",
        law: "Civil Petitions Treatment Act",
        article: "Article 12",
        title: "One-stop processing of related petitions",
        content: "Where several petitions are related, the agency shall process them together so the applicant need not file each one separately.",
        keywords: &["민원", "파생민원", "일괄처리", "petition", "one-stop", "civil affairs"],
        related_articles: &["egov-36"],
    },
    LegalChunk {
        id: "egov-36",
        law: "Electronic Government Act",
        article: "Article 36",
        title: "Sharing of administrative information",
        content: "Administrative agencies shall share information they hold so that applicants are not required to submit documents the government already has.",
        keywords: &["전자정부", "행정정보", "공동이용", "e-government", "information sharing", "documents"],
        related_articles: &["civil-12", "privacy-15"],
    },
    LegalChunk {
        id: "privacy-15",
        law: "Personal Information Protection Act",
        article: "Article 15",
        title: "Collection and use of personal information",
        content: "Personal information may be collected only with consent or where required by law, and only to the minimum extent necessary.",
        keywords: &["개인정보", "동의", "privacy", "personal information", "consent"],
        related_articles: &["privacy-24"],
    },
    LegalChunk {
        id: "privacy-24",
        law: "Personal Information Protection Act",
        article: "Article 24",
        title: "Restriction on unique identifiers",
        content: "Resident registration numbers shall not be processed except where law expressly requires it, and must be encrypted when stored.",
        keywords: &["주민등록번호", "고유식별정보", "identifier", "masking", "privacy"],
        related_articles: &["privacy-15"],
    },
    LegalChunk {
        id: "employment-40",
        law: "Employment Insurance Act",
        article: "Article 40",
        title: "Requirements for job-seeking benefits",
        content: "An insured person who was involuntarily separated and was insured for 180 days or more within the 18 months before separation is eligible for job-seeking benefits.",
        keywords: &["실업", "실직", "고용보험", "구직급여", "unemployment", "job-seeking", "benefit", "welfare"],
        related_articles: &["employment-48"],
    },
    LegalChunk {
        id: "employment-48",
        law: "Employment Insurance Act",
        article: "Article 48",
        title: "Benefit period",
        content: "Job-seeking benefits may be paid only within 12 months from the day after separation.",
        keywords: &["수급기간", "실업급여", "benefit period", "unemployment", "deadline"],
        related_articles: &["employment-40"],
    },
];

/// The whole embedded corpus
pub fn corpus() -> &'static [LegalChunk] {
    CORPUS
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|t| t.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

fn score(chunk: &LegalChunk, tokens: &[String]) -> (u32, Vec<String>) {
    let title = chunk.title.to_lowercase();
    let content = chunk.content.to_lowercase();
    let mut total = 0;
    let mut matched: Vec<String> = Vec::new();

    for token in tokens {
        let mut hit = false;
        if chunk.keywords.iter().any(|k| {
            let k = k.to_lowercase();
            k.contains(token.as_str()) || token.contains(k.as_str())
        }) {
            total += KEYWORD_WEIGHT;
            hit = true;
        }
        if title.contains(token.as_str()) {
            total += TITLE_WEIGHT;
            hit = true;
        }
        if content.contains(token.as_str()) {
            total += CONTENT_WEIGHT;
            hit = true;
        }
        if hit && !matched.contains(token) {
            matched.push(token.clone());
        }
    }

    (total, matched)
}

/// Best `top_k` chunks for a free-text query, highest score first
pub fn search(query: &str, top_k: usize) -> Vec<SearchHit> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = CORPUS
        .iter()
        .filter_map(|chunk| {
            let (score, matched_keywords) = score(chunk, &tokens);
            (score > 0).then_some(SearchHit {
                chunk,
                score,
                matched_keywords,
            })
        })
        .collect();

    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits.truncate(top_k);
    hits
}

/// Chunks of one statute, optionally narrowed to an article
pub fn search_by_law(law: &str, article: Option<&str>) -> Vec<&'static LegalChunk> {
    CORPUS
        .iter()
        .filter(|c| c.law.contains(law))
        .filter(|c| article.map_or(true, |a| c.article.contains(a)))
        .collect()
}

/// Convenience wrapper returning client-facing citations
pub fn citations(query: &str, top_k: usize) -> Vec<LegalCitation> {
    search(query, top_k).iter().map(SearchHit::to_citation).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restaurant_query_finds_food_sanitation() {
        let hits = search("open a restaurant", 3);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].chunk.law, "Food Sanitation Act");
        assert!(hits[0].matched_keywords.contains(&"restaurant".to_string()));
    }

    #[test]
    fn test_korean_keywords_match() {
        let hits = search("전입신고 하려고 합니다", 5);
        assert!(hits.iter().any(|h| h.chunk.id == "resident-10"));
    }

    #[test]
    fn test_top_k_and_ordering() {
        let hits = search("unemployment benefit welfare", 2);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_no_match() {
        assert!(search("zzzz qqqq", 5).is_empty());
        assert!(search("", 5).is_empty());
    }

    #[test]
    fn test_relevance_levels() {
        let cites = citations("restaurant permit", 5);
        assert!(cites.iter().any(|c| c.relevance == Relevance::High));
        let json = serde_json::to_value(&cites[0]).unwrap();
        assert!(json.get("lawName").is_some());
    }

    #[test]
    fn test_search_by_law() {
        assert_eq!(search_by_law("Food Sanitation", None).len(), 3);
        let one = search_by_law("Building Act", Some("38"));
        assert_eq!(one.len(), 1);
        assert_eq!(
            one[0].format_citation(),
            "Basis: Building Act Article 38 (Building register)"
        );
    }
}
