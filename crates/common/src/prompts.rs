//! Prompt templates for the content pipelines

use chrono::{Months, NaiveDate};

/// Title the model returns when it refuses a topic
pub const INVALID_TOPIC_TITLE: &str = "Invalid Topic Request";

/// Categories the model may assign
pub const CATEGORIES: &[&str] = &[
    "Technology",
    "Health",
    "Science",
    "Business",
    "Culture",
    "World News",
    "Travel",
    "Food",
    "Finance",
    "Education",
    "Lifestyle",
    "Entertainment",
];

fn category_list() -> String {
    CATEGORIES
        .iter()
        .map(|c| format!("'{}'", c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn keyword_instruction(keywords: &[String]) -> String {
    if keywords.is_empty() {
        return String::new();
    }

    let list = keywords
        .iter()
        .map(|k| format!("\"{}\"", k))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "\n**SEO Keyword Integration:**\n\
         Weave the following keywords naturally into the article, especially the H2 and H3 headings: {}.\n",
        list
    )
}

const IMAGE_RULE: &str = "Include 3 to 5 `[IMAGE: A detailed description of the image]` \
placeholders on their own lines. The description doubles as the image alt text.";

const REFUSAL_RULE: &str = "If the topic is meaningless, harmful or impossible to write about, \
return the JSON object with \"title\" set to exactly \"Invalid Topic Request\" and empty strings \
for every other key.";

/// Evergreen article: one JSON object with metadata and markdown body
pub fn combined_article(query: &str, keywords: &[String]) -> String {
    format!(
        r#"You are a subject matter expert and SEO content strategist writing an authoritative, engaging blog post.

**Primary Topic:** "{query}"
{keywords}
Respond with a single valid JSON object with these keys:
- "title": a clickable, SEO-optimised title of 50-60 characters containing the primary keyword.
- "meta_description": 140-155 characters, a compelling summary ending with a call to action.
- "slug": a URL-friendly slug.
- "authorName": a plausible expert author name.
- "authorBio": a one-sentence author bio.
- "category": exactly one of [{categories}].
- "content": the full post in Markdown.

Content requirements:
- At least 2500 words. Open with the primary keyword in the first 100 words.
- A "Key Takeaways" bullet list near the beginning.
- 5-7 descriptive H2 (`##`) sections with H3 (`###`) subsections where useful.
- {images}
- A conclusion followed by a "Frequently Asked Questions (FAQ)" section with 3-5 questions.
- No H1 heading; the title is stored separately.

{refusal}"#,
        query = query,
        keywords = keyword_instruction(keywords),
        categories = category_list(),
        images = IMAGE_RULE,
        refusal = REFUSAL_RULE,
    )
}

/// News article written from a headline
pub fn news_article(headline: &str, keywords: &[String]) -> String {
    format!(
        r#"You are a professional journalist at a major international outlet. Your writing is objective, factual and follows the inverted pyramid.

**Headline:** "{headline}"
{keywords}
Write a comprehensive news article of at least 2000 words and respond with a single valid JSON object with these keys:
- "title": the headline.
- "meta_description": an SEO-friendly summary under 155 characters.
- "slug": a URL-friendly slug of the headline.
- "category": the most relevant of [{categories}].
- "authorName": a plausible journalist's name.
- "authorBio": a one-sentence bio for the journalist.
- "content": the article in Markdown with H2 sections. {images}

{refusal}"#,
        headline = headline,
        keywords = keyword_instruction(keywords),
        categories = category_list(),
        images = IMAGE_RULE,
        refusal = REFUSAL_RULE,
    )
}

/// Secondary keyword research: `{"keywords": [...]}`
pub fn keywords(topic: &str) -> String {
    format!(
        r#"You are an SEO keyword researcher. List 7-10 secondary, long-tail and LSI keywords people actively search for about this topic.

**Main Topic:** "{}"

Respond with ONLY a valid JSON object with a single key "keywords" holding an array of strings."#,
        topic
    )
}

/// Topics likely to trend next month: `{"future_topics": [...]}`
pub fn future_topics(today: NaiveDate, count: usize) -> String {
    let next = today.checked_add_months(Months::new(1)).unwrap_or(today);

    format!(
        r#"You are a cultural trend forecaster planning a news blog's content calendar.
It is currently {now}. Plan for **{month}**.

Identify {count} distinct topics that are confirmed or highly likely to be trending search queries during {month}:
1. Festivals and holidays scheduled that month.
2. Confirmed film, series or game releases.
3. Scheduled sporting events and product launches.
Do not include anything that has already happened.

Respond with ONLY a valid JSON object with a single key "future_topics" holding an array of {count} topic strings."#,
        now = today.format("%B %Y"),
        month = next.format("%B %Y"),
        count = count,
    )
}

/// Query wrapping a predicted topic so the article reads as forward-looking
pub fn future_query(topic: &str, today: NaiveDate) -> String {
    format!(
        "Write a forward-looking article about the upcoming event or topic: \"{topic}\". \
         Focus on what to expect, preparations, predictions and why it will matter. \
         Frame everything as happening in the near future ({year} and beyond) and avoid \
         examples from past years.",
        topic = topic,
        year = today.format("%Y"),
    )
}

/// Weekly content cluster plan
pub fn weekly_theme(topic_count: usize) -> String {
    format!(
        r#"You are an SEO content strategist planning a content cluster for the coming week: one broad evergreen pillar topic and several specific supporting topics.

Respond with ONLY a valid JSON object of this exact shape:
{{
  "pillar_topic": "The broad topic for the week",
  "cluster_topics": ["a specific long-tail topic", "..."],
  "category": "One broad category for all of them"
}}

Provide exactly {} cluster topics, one for each day."#,
        topic_count
    )
}

/// Trending topics for one region: `{"topics": [...]}`
pub fn regional_trends(region: &str, lang: &str, count: usize, today: NaiveDate) -> String {
    format!(
        r#"You follow search trends in {region}. Today is {date}.
List the {count} topics people in {region} are most likely searching for right now, phrased as short search queries in the language with code "{lang}".

Respond with ONLY a valid JSON object with a single key "topics" holding an array of {count} strings."#,
        region = region.replace('_', " "),
        date = today.format("%-d %B %Y"),
        count = count,
        lang = lang,
    )
}

/// E-book outline
pub fn ebook_outline(chapter_count: usize) -> String {
    format!(
        r#"You are an author outlining a compelling non-fiction e-book for beginners on a popular topic. The outline must open with an introduction, build through core concepts and end with a conclusion.

Respond with ONLY a valid JSON object of this exact shape:
{{
  "ebook_title": "A marketable title",
  "subtitle": "A descriptive subtitle",
  "category": "One broad category",
  "chapters": [{{ "title": "Introduction: ..." }}, {{ "title": "Chapter 1: ..." }}]
}}

Provide exactly {} chapters including the introduction and conclusion."#,
        chapter_count
    )
}

/// One e-book chapter: `{"content": markdown}`
pub fn ebook_chapter(book_title: &str, subtitle: &str, chapter: &str, outline: &[String]) -> String {
    let toc = outline
        .iter()
        .enumerate()
        .map(|(i, title)| format!("{}. {}", i + 1, title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are writing the e-book "{book}: {subtitle}".

Table of contents:
{toc}

Write the chapter "{chapter}" in full: at least 1500 words of clear, practical Markdown with H2 and H3 headings. Do not repeat material that belongs to other chapters and do not include the chapter title as a heading.

Respond with ONLY a valid JSON object with a single key "content" holding the Markdown."#,
        book = book_title,
        subtitle = subtitle,
        toc = toc,
        chapter = chapter,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_instruction_only_when_present() {
        assert!(!combined_article("rust", &[]).contains("SEO Keyword Integration"));
        let prompt = combined_article("rust", &["borrow checker".to_string()]);
        assert!(prompt.contains("\"borrow checker\""));
        assert!(prompt.contains(INVALID_TOPIC_TITLE));
    }

    #[test]
    fn test_future_topics_names_next_month() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();
        let prompt = future_topics(today, 10);
        assert!(prompt.contains("December 2025"));
        assert!(prompt.contains("January 2026"));
    }

    #[test]
    fn test_chapter_prompt_lists_outline() {
        let outline = vec!["Intro".to_string(), "Basics".to_string()];
        let prompt = ebook_chapter("Book", "Sub", "Basics", &outline);
        assert!(prompt.contains("1. Intro\n2. Basics"));
    }
}
