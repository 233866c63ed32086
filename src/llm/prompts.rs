//! Prompt templates for the two gateway calls.

/// Prompt asking for a reference list and in-text citation as JSON.
pub fn citation_prompt(citation_guide: &str, article_metadata: &str) -> String {
    format!(
        r#"Analyze the provided PubMed journal article metadata and generate citations according to the Open University Harvard Cite Them Right format.
Use the citation guide provided below for reference.

Citation Guide:
{citation_guide}

Article Metadata:
{article_metadata}

Generate both a reference list citation and an in-text citation.
Ensure strict adherence to the specified citation format.
If you encounter any issues or ambiguities, explain them in the 'reason' field.

Also extract the following information:
- Article title
- DOI (if available)
- Publication date

Return your response in the following JSON format:
{{
    "success": <boolean - whether citation generation succeeded>,
    "reference_list_citation": <string or null - the reference list citation>,
    "in_text_citation": <string or null - the in-text citation>,
    "title": <string - the article title>,
    "doi": <string or null - the DOI>,
    "publication_date": <string - the publication date as day with ordinal suffix, full month name and year, e.g. '1st January 2024'>,
    "reason": <string or null - explanation if success is false, otherwise null>
}}

Note:
- 'success' must be a boolean.
- 'reference_list_citation' and 'in_text_citation' must be strings when successful, otherwise null.
- 'reason' must only be a string when 'success' is false, otherwise null.
- 'in_text_citation' must always take the form (author(s), year), using the first author followed by et al when there are more than two authors.
- Include every field in the response, even when null.
- Do not include any XML in the JSON values."#
    )
}

/// Prompt asking whether an article body supports the claim, as JSON.
pub fn relevance_prompt(claim: &str, article_body: &str) -> String {
    format!(
        r#"Analyze the following text and the provided article body. Determine whether a section of the article body strongly supports the statement(s) made in the text. If it does, quote that section.

Text to check:
{claim}

Article body:
{article_body}

Return your response in the following JSON format:
{{
    "found_relevant_passage": <boolean - whether a highly relevant passage was found>,
    "passage": <string or null - the relevant passage if found, otherwise null>,
    "reasoning": <string - why the passage supports the text, or why no passage does>
}}

Note:
- 'found_relevant_passage' must be a boolean.
- 'passage' must be a string when a relevant passage is found, otherwise null.
- 'reasoning' must always be filled in.
- Do not include any XML in the JSON values."#
    )
}
