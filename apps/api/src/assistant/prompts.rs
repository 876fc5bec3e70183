// Prompt templates for the writing assistant. Placeholders in `{braces}`
// are substituted by assistant::generator before sending.

pub const SUMMARY_ROLE: &str =
    "You are an experienced recruiter who writes concise CV profile summaries.";

pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"Write the professional summary ("profil") at the top of a CV.

Target position: {job_title}

Work experience:
{experiences}

Skills: {skills}

Rules:
- 3 to 4 sentences, at most 80 words.
- First person implied: no "I", no "je", no name.
- Mention years of experience only if the dates above support it.
- Return only the summary text, without quotes or headings."#;

pub const BULLETS_ROLE: &str =
    "You are a CV coach who turns job descriptions into achievement-oriented bullet points.";

pub const BULLETS_PROMPT_TEMPLATE: &str = r#"Write {count} bullet points for this position.

Position: {position}
Company: {company}
What the candidate says they did:
{description}

Rules:
- Start each bullet with a strong action verb.
- One line each, at most 20 words.
- Keep any figures the candidate gave; never invent new ones.

Return a JSON array of strings, for example:
["Managed a portfolio of 40 SME clients", "Reduced month-end closing time"]"#;

pub const SKILLS_ROLE: &str =
    "You are a career advisor who knows which skills employers look for in each trade.";

pub const SKILLS_PROMPT_TEMPLATE: &str = r#"Suggest up to {count} additional skills for a candidate targeting this position.

Target position: {job_title}
Skills already listed: {existing}

Rules:
- Mix technical skills and soft skills relevant to the position.
- Do not repeat skills already listed, even with different wording.
- Each skill is 1 to 4 words.

Return a JSON array of strings."#;

pub const COVER_LETTER_ROLE: &str =
    "You are a professional writer of cover letters for job applications.";

pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Write the body of a cover letter.

Candidate: {full_name}
Current title: {job_title}
Profile summary: {summary}
Recent experience:
{experiences}

Applying to: {position} at {company}
Job description (may be empty):
{job_description}

Rules:
- 3 or 4 paragraphs separated by a blank line, at most 300 words.
- No address block, no date, no subject line, no signature.
- Finish with a polite closing sentence requesting an interview."#;

pub const IMPORT_ROLE: &str =
    "You extract structured CV data from raw text copied out of a PDF.";

pub const IMPORT_PROMPT_TEMPLATE: &str = r#"Extract the CV below into this JSON schema (omit unknown values, use empty arrays when a section is absent):
{
  "personal_info": {"full_name": "", "job_title": "", "email": "", "phone": "", "address": "", "city": "", "country": "", "linkedin": null, "website": null},
  "experiences": [{"position": "", "company": "", "city": "", "start_date": "", "end_date": null, "current": false, "description": "", "bullets": []}],
  "educations": [{"degree": "", "school": "", "city": "", "start_date": "", "end_date": null, "description": ""}],
  "skills": [{"name": "", "level": null}],
  "languages": [{"name": "", "proficiency": ""}],
  "summary": "",
  "references": [{"name": "", "position": "", "company": "", "email": "", "phone": ""}],
  "additional_sections": [{"title": "", "items": []}]
}

Dates use "YYYY-MM" when the month is known, otherwise "YYYY".

CV text:
---
{raw_text}
---"#;
