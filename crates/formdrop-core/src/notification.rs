use crate::submission::{StoredAsset, Submission};

pub const NOTIFICATION_SUBJECT: &str = "Új űrlap beküldés";

pub fn escape_html(s: &str) -> String {
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

/// Render the notification body for a submission and its uploaded images.
///
/// Field values and link texts are escaped; hrefs are the signed URLs as issued.
pub fn compose_notification(submission: &Submission, assets: &[StoredAsset]) -> String {
    let links: String = assets
        .iter()
        .map(|a| {
            format!(
                "<li><a href=\"{}\">{}</a></li>",
                a.access_url,
                escape_html(&a.display_name)
            )
        })
        .collect();

    format!(
        "<p><b>Név:</b> {} {}</p>\n\
         <p><b>Telefon:</b> {}</p>\n\
         <p><b>Email:</b> {}</p>\n\
         <p><b>Leírás:</b><br>{}</p>\n\
         <p><b>Képek:</b></p>\n\
         <ul>{}</ul>\n",
        escape_html(submission.field("lastname")),
        escape_html(submission.field("firstname")),
        escape_html(submission.field("phone")),
        escape_html(submission.field("email")),
        escape_html(submission.field("desc")).replace('\n', "<br>"),
        links,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(fields: &[(&str, &str)]) -> Submission {
        let mut s = Submission::default();
        for (k, v) in fields {
            s.fields.insert(k.to_string(), v.to_string());
        }
        s
    }

    #[test]
    fn escapes_all_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn renders_fields_in_fixed_order() {
        let s = submission(&[
            ("firstname", "Éva"),
            ("lastname", "Kis"),
            ("phone", "+36201234567"),
            ("email", "e@x.hu"),
            ("desc", "Line1\nLine2"),
        ]);
        let html = compose_notification(&s, &[]);
        assert!(html.contains("<p><b>Név:</b> Kis Éva</p>"));
        assert!(html.contains("<p><b>Telefon:</b> +36201234567</p>"));
        assert!(html.contains("<p><b>Email:</b> e@x.hu</p>"));
        assert!(html.contains("<br>Line1<br>Line2</p>"));

        let name = html.find("Név:").unwrap();
        let phone = html.find("Telefon:").unwrap();
        let email = html.find("Email:").unwrap();
        let desc = html.find("Leírás:").unwrap();
        assert!(name < phone && phone < email && email < desc);
    }

    #[test]
    fn missing_fields_render_empty() {
        let html = compose_notification(&submission(&[]), &[]);
        assert!(html.contains("<p><b>Név:</b>  </p>"));
        assert!(html.contains("<p><b>Telefon:</b> </p>"));
        assert!(html.contains("<ul></ul>"));
    }

    #[test]
    fn user_markup_never_appears_literally() {
        let hostile = "<script>alert('x')</script>";
        let s = submission(&[("desc", hostile), ("firstname", "\"><img>")]);
        let assets = [StoredAsset {
            display_name: "<b>evil</b>.png".into(),
            access_url: "https://blob.example/uploads/1_evil.png?sig=a%2Bb".into(),
        }];
        let html = compose_notification(&s, &assets);
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<img>"));
        assert!(!html.contains("<b>evil</b>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(html.contains("&lt;b&gt;evil&lt;/b&gt;.png</a>"));
    }

    #[test]
    fn links_keep_submission_order_and_raw_urls() {
        let assets = [
            StoredAsset {
                display_name: "első.jpg".into(),
                access_url: "https://h/c/1_els_.jpg?se=1&sp=r&sig=x".into(),
            },
            StoredAsset {
                display_name: "second.png".into(),
                access_url: "https://h/c/2_second.png?se=1&sp=r&sig=y".into(),
            },
        ];
        let html = compose_notification(&submission(&[]), &assets);
        assert!(html.contains(
            "<ul><li><a href=\"https://h/c/1_els_.jpg?se=1&sp=r&sig=x\">első.jpg</a></li>\
             <li><a href=\"https://h/c/2_second.png?se=1&sp=r&sig=y\">second.png</a></li></ul>"
        ));
    }
}
