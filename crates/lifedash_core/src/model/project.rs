//! Projects table rows.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TODO_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[([ xX])\]\s*(.*)$").expect("valid todo line regex"));

/// Monotonically assigned integer id.
pub type ProjectId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl ProjectPriority {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Which external link slot to edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectLinkKind {
    Github,
    Website,
    Database,
    Hosting,
    Repo,
    ObsidianNote,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosting_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obsidian_note: Option<String>,
}

impl ProjectLinks {
    pub fn slot_mut(&mut self, kind: ProjectLinkKind) -> &mut Option<String> {
        match kind {
            ProjectLinkKind::Github => &mut self.github_url,
            ProjectLinkKind::Website => &mut self.website_url,
            ProjectLinkKind::Database => &mut self.database_url,
            ProjectLinkKind::Hosting => &mut self.hosting_url,
            ProjectLinkKind::Repo => &mut self.repo_url,
            ProjectLinkKind::ObsidianNote => &mut self.obsidian_note,
        }
    }
}

/// One entry of the `projects` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub priority: ProjectPriority,
    #[serde(default)]
    pub category: String,
    /// Line-per-task text, `[x] done` / `[ ] open`.
    #[serde(default)]
    pub todos: String,
    #[serde(flatten)]
    pub links: ProjectLinks,
}

/// One parsed line of `Project::todos`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTodo {
    pub text: String,
    pub done: bool,
}

impl Project {
    /// Parses the todo text. Unmarked non-blank lines count as open todos.
    pub fn todo_items(&self) -> Vec<ProjectTodo> {
        self.todos
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| match TODO_LINE_RE.captures(line) {
                Some(caps) => ProjectTodo {
                    text: caps[2].trim().to_string(),
                    done: !caps[1].trim().is_empty(),
                },
                None => ProjectTodo {
                    text: line.trim().to_string(),
                    done: false,
                },
            })
            .collect()
    }

    /// `(done, total)` todo counts.
    pub fn progress(&self) -> (usize, usize) {
        let items = self.todo_items();
        let done = items.iter().filter(|item| item.done).count();
        (done, items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::{Project, ProjectLinks, ProjectPriority};

    fn project(todos: &str) -> Project {
        Project {
            id: 1,
            name: "Garden".to_string(),
            priority: ProjectPriority::High,
            category: "home".to_string(),
            todos: todos.to_string(),
            links: ProjectLinks::default(),
        }
    }

    #[test]
    fn todo_items_parse_checkbox_convention() {
        let items =
            project("[x] buy soil\n[ ] plant beans\n\n  water daily  \n[X] rake").todo_items();
        let summary: Vec<(&str, bool)> = items
            .iter()
            .map(|item| (item.text.as_str(), item.done))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("buy soil", true),
                ("plant beans", false),
                ("water daily", false),
                ("rake", true)
            ]
        );
    }

    #[test]
    fn progress_counts_done_over_total() {
        assert_eq!(project("[x] a\n[ ] b\n[ ] c").progress(), (1, 3));
        assert_eq!(project("").progress(), (0, 0));
    }

    #[test]
    fn links_flatten_into_project_json() {
        let mut value = project("");
        value.links.github_url = Some("https://github.com/me/garden".to_string());
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["githubUrl"], "https://github.com/me/garden");
        assert!(json.get("websiteUrl").is_none());
    }
}
