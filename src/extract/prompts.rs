/// Prompt for the company profile of one content chunk
pub fn profile_prompt(domain: &str, chunk: &str) -> String {
    format!(
        r#"Extract the company profile and SMYKM ("Show Me You Know Me") notes from this website content.

Rules:
1. Find ALL contact information: emails, phone numbers, postal addresses, social media links.
2. Treat anything shaped like name@host.tld as an email address and include it.
3. Take social media URLs from links (linkedin.com, instagram.com, twitter.com, facebook.com, youtube.com, tiktok.com).
4. SMYKM notes are specific, factual observations that show the company was researched.

Return JSON with exactly this schema:
{{
  "domain": "{domain}",
  "company": "Full company name",
  "description": "What the company sells and how the business works",
  "smykm_notes": ["Specific fact", "Differentiator", "Award or milestone", "Culture or values"],
  "main_contacts": {{
    "email": ["contact@example.com"],
    "phone": ["+1-555-0100"],
    "address": ["Full address"],
    "contact_page": "https://example.com/contact"
  }},
  "social_media": {{
    "linkedin": "", "instagram": "", "twitter": "", "facebook": "", "youtube": "", "tiktok": ""
  }}
}}

CONTENT:
{chunk}
"#
    )
}

/// Prompt for the products of one content chunk, restricted to an industry
pub fn products_prompt(industry: &str, chunk: &str) -> String {
    format!(
        r#"Extract ONLY products related to: {industry}

Rules:
1. Ignore products that are not related to {industry}.
2. Copy product names, descriptions and specs exactly as written on the website.
3. Copy customer reviews verbatim when the page shows them.

For each relevant product return:
{{
  "brand": "Brand name if mentioned",
  "name": "Exact product name",
  "category": "Product category",
  "price": "Price exactly as shown",
  "specs": {{"key": "value as shown"}},
  "description": "Exact product description",
  "image_url": "Product image URL if found",
  "url": "Product page URL",
  "reviews": ["Exact review quote"]
}}

Return JSON with a "products" key holding an array of the relevant products,
or an empty array when there are none.

CONTENT:
{chunk}
"#
    )
}
