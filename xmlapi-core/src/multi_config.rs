use crate::client::XmlApiError;
use crate::xml::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveWhere {
    Top,
    Bottom,
    Before,
    After,
}

impl MoveWhere {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveWhere::Top => "top",
            MoveWhere::Bottom => "bottom",
            MoveWhere::Before => "before",
            MoveWhere::After => "after",
        }
    }
}

/// A single configuration mutation, addressed by xpath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Edit {
        xpath: String,
        element: Element,
    },
    Delete {
        xpath: String,
    },
    Rename {
        xpath: String,
        new_name: String,
    },
    Move {
        xpath: String,
        position: MoveWhere,
        destination: Option<String>,
    },
}

impl Operation {
    pub fn xpath(&self) -> &str {
        match self {
            Operation::Edit { xpath, .. }
            | Operation::Delete { xpath }
            | Operation::Rename { xpath, .. }
            | Operation::Move { xpath, .. } => xpath,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Operation::Edit { .. } => "edit",
            Operation::Delete { .. } => "delete",
            Operation::Rename { .. } => "rename",
            Operation::Move { .. } => "move",
        }
    }

    fn to_element(&self, id: usize) -> Element {
        let mut element = Element::new(self.action())
            .with_attribute("id", id.to_string())
            .with_attribute("xpath", self.xpath());
        match self {
            Operation::Edit { element: payload, .. } => element.children.push(payload.clone()),
            Operation::Delete { .. } => {}
            Operation::Rename { new_name, .. } => element.set_attribute("newname", new_name),
            Operation::Move {
                position,
                destination,
                ..
            } => {
                element.set_attribute("where", position.as_str());
                if let Some(dst) = destination {
                    element.set_attribute("dst", dst);
                }
            }
        }
        element
    }
}

/// Renders operations into a `<multi-config>` document. Ids start at 1.
pub fn render(operations: &[Operation], strict: bool) -> Element {
    let mut root = Element::new("multi-config");
    if strict {
        root.set_attribute("strict-transactional", "yes");
    }
    root.children = operations
        .iter()
        .enumerate()
        .map(|(idx, op)| op.to_element(idx + 1))
        .collect();
    root
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub id: Option<String>,
    pub status: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiConfigResponse {
    pub status: String,
    pub code: Option<u32>,
    pub results: Vec<OperationResult>,
}

impl MultiConfigResponse {
    pub fn from_element(root: &Element) -> Self {
        let results = root
            .children_named("response")
            .map(|child| OperationResult {
                id: child.attribute("id").map(str::to_string),
                status: child.attribute("status").unwrap_or_default().to_string(),
                message: child
                    .child("msg")
                    .map(Element::collect_text)
                    .filter(|m| !m.is_empty()),
            })
            .collect();
        Self {
            status: root.attribute("status").unwrap_or_default().to_string(),
            code: root.attribute("code").and_then(|c| c.parse().ok()),
            results,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// First failed sub-operation, if the device reported one.
    pub fn first_failure(&self) -> Option<&OperationResult> {
        self.results.iter().find(|r| r.status != "success")
    }

    /// Turns a failed response into an API error. The message of the first
    /// failed sub-operation is used when the device sent one.
    pub fn ensure_success(&self) -> Result<(), XmlApiError> {
        if self.is_success() {
            return Ok(());
        }
        let message = self
            .first_failure()
            .and_then(|failure| failure.message.clone())
            .unwrap_or_else(|| match self.code {
                Some(code) => format!("multi-config failed with code {code}"),
                None => "multi-config failed".to_string(),
            });
        Err(XmlApiError::Api {
            code: self.code,
            message,
        })
    }
}
