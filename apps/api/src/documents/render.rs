use crate::documents::models::{CvContent, DocumentKind};

/// Options controlling an HTML export.
pub struct RenderOptions<'a> {
    pub title: &'a str,
    pub kind: DocumentKind,
    pub template_id: Option<&'a str>,
    /// Previews of unpaid documents carry a watermark banner.
    pub watermark: bool,
}

/// Renders a document as a standalone, semantic HTML page. Visual styling is
/// owned by the template stylesheet keyed on the `template-*` class.
pub fn render_html(content: &CvContent, opts: &RenderOptions<'_>) -> String {
    let template = opts.template_id.unwrap_or("classique");
    let mut html = String::with_capacity(4096);

    html.push_str("<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape(opts.title)));
    html.push_str("</head>\n");
    html.push_str(&format!(
        "<body class=\"document {} template-{}\">\n",
        opts.kind.as_str(),
        escape(template)
    ));
    if opts.watermark {
        html.push_str("<div class=\"watermark\">APERÇU - CV Chap Chap</div>\n");
    }

    render_header(&mut html, content);
    match opts.kind {
        DocumentKind::Cv => render_cv_body(&mut html, content),
        DocumentKind::CoverLetter => render_letter_body(&mut html, content),
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_header(html: &mut String, content: &CvContent) {
    let info = &content.personal_info;
    html.push_str("<header>\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape(&info.full_name)));
    if !info.job_title.is_empty() {
        html.push_str(&format!("<h2>{}</h2>\n", escape(&info.job_title)));
    }
    let location = [info.address.as_str(), info.city.as_str(), info.country.as_str()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    let contacts = [
        info.email.as_str(),
        info.phone.as_str(),
        location.as_str(),
        info.linkedin.as_deref().unwrap_or(""),
        info.website.as_deref().unwrap_or(""),
    ];
    html.push_str("<ul class=\"contact\">\n");
    for c in contacts.iter().filter(|c| !c.is_empty()) {
        html.push_str(&format!("<li>{}</li>\n", escape(c)));
    }
    html.push_str("</ul>\n</header>\n");
}

fn render_cv_body(html: &mut String, content: &CvContent) {
    if !content.summary.trim().is_empty() {
        open_section(html, "summary", "Profil");
        html.push_str(&format!("<p>{}</p>\n", escape(content.summary.trim())));
        html.push_str("</section>\n");
    }

    if !content.experiences.is_empty() {
        open_section(html, "experience", "Expérience professionnelle");
        for exp in &content.experiences {
            html.push_str("<article>\n");
            html.push_str(&format!(
                "<h4>{} - {}</h4>\n",
                escape(&exp.position),
                escape(&exp.company)
            ));
            let end = if exp.current {
                "Aujourd'hui".to_string()
            } else {
                exp.end_date.clone().unwrap_or_default()
            };
            html.push_str(&format!(
                "<p class=\"period\">{} - {}{}</p>\n",
                escape(&exp.start_date),
                escape(&end),
                if exp.city.is_empty() {
                    String::new()
                } else {
                    format!(" | {}", escape(&exp.city))
                }
            ));
            if !exp.description.is_empty() {
                html.push_str(&format!("<p>{}</p>\n", escape(&exp.description)));
            }
            push_list(html, exp.bullets.iter().map(String::as_str));
            html.push_str("</article>\n");
        }
        html.push_str("</section>\n");
    }

    if !content.educations.is_empty() {
        open_section(html, "education", "Formation");
        for edu in &content.educations {
            html.push_str("<article>\n");
            html.push_str(&format!(
                "<h4>{} - {}</h4>\n",
                escape(&edu.degree),
                escape(&edu.school)
            ));
            html.push_str(&format!(
                "<p class=\"period\">{} - {}</p>\n",
                escape(&edu.start_date),
                escape(edu.end_date.as_deref().unwrap_or(""))
            ));
            if !edu.description.is_empty() {
                html.push_str(&format!("<p>{}</p>\n", escape(&edu.description)));
            }
            html.push_str("</article>\n");
        }
        html.push_str("</section>\n");
    }

    if !content.skills.is_empty() {
        open_section(html, "skills", "Compétences");
        html.push_str("<ul>\n");
        for skill in &content.skills {
            match skill.level {
                Some(level) => html.push_str(&format!(
                    "<li data-level=\"{level}\">{}</li>\n",
                    escape(&skill.name)
                )),
                None => html.push_str(&format!("<li>{}</li>\n", escape(&skill.name))),
            }
        }
        html.push_str("</ul>\n</section>\n");
    }

    if !content.languages.is_empty() {
        open_section(html, "languages", "Langues");
        let items: Vec<String> = content
            .languages
            .iter()
            .map(|l| format!("{} ({})", l.name, l.proficiency))
            .collect();
        push_list(html, items.iter().map(String::as_str));
        html.push_str("</section>\n");
    }

    for section in &content.additional_sections {
        if section.items.is_empty() {
            continue;
        }
        open_section(html, "additional", &section.title);
        push_list(html, section.items.iter().map(String::as_str));
        html.push_str("</section>\n");
    }

    if !content.references.is_empty() {
        open_section(html, "references", "Références");
        for r in &content.references {
            html.push_str(&format!(
                "<p><strong>{}</strong>, {} - {}<br>{} {}</p>\n",
                escape(&r.name),
                escape(&r.position),
                escape(&r.company),
                escape(&r.email),
                escape(&r.phone)
            ));
        }
        html.push_str("</section>\n");
    }
}

fn render_letter_body(html: &mut String, content: &CvContent) {
    let Some(letter) = &content.cover_letter else {
        return;
    };
    html.push_str("<section class=\"letter\">\n");
    if !letter.recipient_name.is_empty() || !letter.company.is_empty() {
        html.push_str(&format!(
            "<p class=\"recipient\">{}<br>{}</p>\n",
            escape(&letter.recipient_name),
            escape(&letter.company)
        ));
    }
    if !letter.position.is_empty() {
        html.push_str(&format!(
            "<p class=\"subject\">Objet : candidature au poste de {}</p>\n",
            escape(&letter.position)
        ));
    }
    for paragraph in letter.body.split("\n\n").filter(|p| !p.trim().is_empty()) {
        html.push_str(&format!("<p>{}</p>\n", escape(paragraph.trim())));
    }
    html.push_str("</section>\n");
}

fn open_section(html: &mut String, class: &str, title: &str) {
    html.push_str(&format!(
        "<section class=\"{class}\">\n<h3>{}</h3>\n",
        escape(title)
    ));
}

fn push_list<'a>(html: &mut String, items: impl Iterator<Item = &'a str>) {
    let items: Vec<_> = items.filter(|i| !i.trim().is_empty()).collect();
    if items.is_empty() {
        return;
    }
    html.push_str("<ul>\n");
    for item in items {
        html.push_str(&format!("<li>{}</li>\n", escape(item)));
    }
    html.push_str("</ul>\n");
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
