use chrono::NaiveDate;
use html_escape::encode_text;

use super::PageSettings;

fn url_entry(loc: &str, lastmod: &str, changefreq: &str, priority: &str) -> String {
    format!(
        "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>{}</changefreq>\n    <priority>{}</priority>\n  </url>",
        encode_text(loc),
        lastmod,
        changefreq,
        priority
    )
}

/// sitemap.xml listing the index, the about page and every recipe page
pub fn render_sitemap(slugs: &[String], settings: &PageSettings, date: NaiveDate) -> String {
    let lastmod = date.format("%Y-%m-%d").to_string();

    let mut entries = vec![
        url_entry(&format!("{}/", settings.site_url()), &lastmod, "weekly", "1.0"),
        url_entry(
            &settings.absolute(&settings.page_href("about")),
            &lastmod,
            "monthly",
            "0.5",
        ),
    ];
    entries.extend(slugs.iter().map(|slug| {
        url_entry(
            &settings.absolute(&settings.page_href(slug)),
            &lastmod,
            "monthly",
            "0.8",
        )
    }));

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}\n</urlset>\n",
        entries.join("\n")
    )
}
