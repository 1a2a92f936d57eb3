//! Page skeleton and escaping for the HTML report.

use std::fmt::Write;

/// Escapes text for use in HTML element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Makes serialized JSON safe to place inside a `<script>` element.
pub fn script_safe_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0 1.5rem 2rem; color: #212121; }
h1 { font-size: 1.4rem; margin: 1rem 0 0.25rem; }
.meta { color: #616161; margin-bottom: 1rem; }
#map { height: 70vh; border: 1px solid #bdbdbd; margin-bottom: 1.5rem; }
table { border-collapse: collapse; font-size: 0.8rem; margin-bottom: 1.5rem; }
th, td { border: 1px solid #e0e0e0; padding: 2px 6px; text-align: right; white-space: nowrap; }
th { background: #f5f5f5; text-align: center; }
td.key, td.id { text-align: left; }
td.absent { color: #9e9e9e; text-align: center; }
.legend span { display: inline-block; width: 1rem; height: 0.6rem; margin: 0 0.25rem 0 0.75rem; }
"#;

const SCRIPT: &str = r#"
(function () {
  const data = JSON.parse(document.getElementById('map-data').textContent);
  const map = L.map('map').setView([data.center.lat, data.center.lon], data.zoom);
  L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
    maxZoom: 18,
    attribution: '&copy; OpenStreetMap contributors'
  }).addTo(map);
  const overlays = {};
  for (const layer of data.layers) {
    const group = L.layerGroup();
    for (const m of layer.markers) {
      L.circleMarker([m.position.lat, m.position.lon], { radius: 4, color: m.color, fillOpacity: 0.8 })
        .bindPopup(m.popup)
        .addTo(group);
    }
    for (const p of layer.polylines) {
      L.polyline(p.path.map(c => [c.lat, c.lon]), { color: p.color, weight: 3 })
        .bindPopup(p.popup)
        .addTo(group);
    }
    if (layer.visible) {
      group.addTo(map);
    }
    overlays[layer.name] = group;
  }
  L.control.layers(null, overlays, { collapsed: false }).addTo(map);
})();
"#;

/// Body sections of a report, already rendered to HTML.
pub struct Sections<'a> {
    pub title: &'a str,
    pub meta: &'a str,
    pub legend: &'a str,
    pub summary: &'a str,
    pub table: &'a str,
    pub map_json: &'a str,
}

/// Assembles a standalone page. Map tiles and Leaflet are fetched by the
/// browser when the file is opened.
pub fn page(sections: &Sections<'_>) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape(sections.title));
    let _ = writeln!(html, "<link rel=\"stylesheet\" href=\"{LEAFLET_CSS}\">");
    let _ = writeln!(html, "<script src=\"{LEAFLET_JS}\"></script>");
    let _ = writeln!(html, "<style>{STYLE}</style>");
    html.push_str("</head>\n<body>\n");

    let _ = writeln!(html, "<h1>{}</h1>", escape(sections.title));
    let _ = writeln!(html, "<div class=\"meta\">{}</div>", sections.meta);
    let _ = writeln!(html, "<div class=\"legend\">{}</div>", sections.legend);
    html.push_str("<div id=\"map\"></div>\n");
    html.push_str(sections.summary);
    html.push_str(sections.table);

    let _ = writeln!(
        html,
        "<script type=\"application/json\" id=\"map-data\">{}</script>",
        script_safe_json(sections.map_json)
    );
    let _ = writeln!(html, "<script>{SCRIPT}</script>");
    html.push_str("</body>\n</html>\n");

    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>R&D \"x\"</b>"), "&lt;b&gt;R&amp;D &quot;x&quot;&lt;/b&gt;");
        assert_eq!(escape("Umspannwerk Güstrow"), "Umspannwerk Güstrow");
    }

    #[test]
    fn test_script_safe_json() {
        let json = r#"{"popup":"</script><script>alert(1)"}"#;
        assert!(!script_safe_json(json).contains("</script>"));
    }

    #[test]
    fn test_page_contains_sections() {
        let html = page(&Sections {
            title: "Grid <comparison>",
            meta: "meta",
            legend: "legend",
            summary: "<section id=\"summary\"></section>",
            table: "<table id=\"lines\"></table>",
            map_json: "{}",
        });

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Grid &lt;comparison&gt;</title>"));
        assert!(html.contains("<table id=\"lines\"></table>"));
        assert!(html.contains("id=\"map-data\">{}</script>"));
        assert!(html.trim_end().ends_with("</html>"));
    }
}
