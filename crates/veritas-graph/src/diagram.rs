//! Graphviz rendering of a retrieved subgraph

use crate::model::Relation;
use crate::retrieval::RetrievedContext;
use std::collections::BTreeSet;
use std::fmt::Write;

/// Render `context` as a DOT digraph
///
/// Articles are boxes, sites are folders, entities are ellipses and topics
/// are notes. Output is stable for a given context.
pub fn render_dot(context: &RetrievedContext) -> String {
    let mut nodes = BTreeSet::new();
    let mut edges = Vec::new();

    for (idx, article) in context.articles.iter().enumerate() {
        let id = format!("a{}", idx);
        nodes.insert((id.clone(), escape(&article.title), "box"));
        if let Some(site) = &article.site {
            let site_id = format!("s_{}", slug(site));
            nodes.insert((site_id.clone(), escape(site), "folder"));
            edges.push((id.clone(), site_id, Relation::PublishedOn));
        }
        for topic in &article.topics {
            let topic_id = format!("t_{}", slug(topic));
            nodes.insert((topic_id.clone(), escape(topic), "note"));
            edges.push((id.clone(), topic_id, Relation::HasTopic));
        }
        for entity in &article.entities {
            let entity_id = format!("e_{}", slug(entity));
            nodes.insert((entity_id.clone(), escape(entity), "ellipse"));
            edges.push((id.clone(), entity_id, Relation::Mentions));
        }
    }

    let mut dot = String::from("digraph claim {\n  rankdir=LR;\n");
    for (id, label, shape) in &nodes {
        let _ = writeln!(dot, "  {} [label=\"{}\", shape={}];", id, label, shape);
    }
    for (from, to, relation) in &edges {
        let _ = writeln!(dot, "  {} -> {} [label=\"{}\"];", from, to, relation);
    }
    dot.push_str("}\n");
    dot
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', " ")
}

fn slug(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::ContextArticle;

    #[test]
    fn test_render_shared_site_once() {
        let article = |url: &str, title: &str| ContextArticle {
            url: url.to_string(),
            title: title.to_string(),
            site: Some("news.example".to_string()),
            topics: vec!["Environment".to_string()],
            entities: vec!["City \"X\"".to_string()],
            excerpt: String::new(),
            score: 1.0,
        };
        let context = RetrievedContext {
            articles: vec![article("u1", "First"), article("u2", "Second")],
        };
        let dot = render_dot(&context);

        assert!(dot.starts_with("digraph claim {"));
        assert_eq!(dot.matches("shape=folder").count(), 1);
        assert_eq!(dot.matches("PUBLISHED_ON").count(), 2);
        assert!(dot.contains("label=\"City \\\"X\\\"\""));
        assert!(dot.contains("a1 -> t_environment [label=\"HAS_TOPIC\"]"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_dot(&RetrievedContext::default()), "digraph claim {\n  rankdir=LR;\n}\n");
    }
}
