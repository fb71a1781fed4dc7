use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::data::entity::{CompanyId, Draft, Entity, RecordId};
use crate::data::store::Direction;
use crate::views::form::RequiredFields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgStatus {
    Active,
    Archived,
}

impl OrgStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub name: String,
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub parent_id: Option<RecordId>,
    #[serde(default)]
    pub manager_id: Option<RecordId>,
    #[serde(default)]
    pub description: Option<String>,
    pub status: OrgStatus,
}

impl Entity for OrganizationalUnit {
    const TABLE: &'static str = "organizational_units";
    const LABEL: &'static str = "organizational units";
    const ORDER_BY: (&'static str, Direction) = ("name", Direction::Ascending);

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.unit_type.as_deref());
        fields.extend(self.description.as_deref());
        fields
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationalUnitDraft {
    pub name: Option<String>,
    pub unit_type: Option<String>,
    pub parent_id: Option<RecordId>,
    pub manager_id: Option<RecordId>,
    pub description: Option<String>,
    pub status: Option<OrgStatus>,
}

impl Draft for OrganizationalUnitDraft {
    type Record = OrganizationalUnit;
    const DEFAULT_STATUS: Option<&'static str> = Some("active");

    fn required(&self) -> RequiredFields {
        RequiredFields::new().text("name", self.name.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub unit_id: Option<RecordId>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub status: OrgStatus,
}

impl Entity for Role {
    const TABLE: &'static str = "roles";
    const LABEL: &'static str = "roles";
    const ORDER_BY: (&'static str, Direction) = ("name", Direction::Ascending);

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.description.as_deref());
        fields.extend(self.permissions.iter().map(String::as_str));
        fields
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit_id: Option<RecordId>,
    pub permissions: Vec<String>,
    pub status: Option<OrgStatus>,
}

impl Draft for RoleDraft {
    type Record = Role;
    const DEFAULT_STATUS: Option<&'static str> = Some("active");

    fn required(&self) -> RequiredFields {
        RequiredFields::new().text("name", self.name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrgNode {
    pub id: RecordId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,
    pub roles: Vec<String>,
    pub children: Vec<OrgNode>,
}

impl OrgNode {
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(OrgNode::size).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrgTree {
    pub roots: Vec<OrgNode>,
    pub unit_count: usize,
}

impl OrgTree {
    /// Builds the unit hierarchy from `parent_id` links.
    ///
    /// Units whose parent is unknown become roots. A link that would close a
    /// cycle is dropped, so every unit appears exactly once.
    pub fn build(units: &[OrganizationalUnit], roles: &[Role]) -> Self {
        let known: HashSet<&RecordId> = units.iter().map(|unit| &unit.id).collect();

        let mut children: BTreeMap<&RecordId, Vec<&OrganizationalUnit>> = BTreeMap::new();
        let mut roots: Vec<&OrganizationalUnit> = Vec::new();
        for unit in units {
            match &unit.parent_id {
                Some(parent) if known.contains(parent) && parent != &unit.id => {
                    children.entry(parent).or_default().push(unit)
                }
                _ => roots.push(unit),
            }
        }

        let mut role_names: BTreeMap<&RecordId, Vec<String>> = BTreeMap::new();
        for role in roles {
            if let Some(unit) = &role.unit_id {
                role_names.entry(unit).or_default().push(role.name.clone());
            }
        }

        let mut visited: HashSet<&RecordId> = HashSet::new();
        roots.sort_by(|left, right| left.name.cmp(&right.name));
        let mut nodes: Vec<OrgNode> = roots
            .into_iter()
            .filter_map(|unit| attach(unit, &children, &role_names, &mut visited))
            .collect();

        // units caught in a parent cycle never hang off a root
        let mut orphans: Vec<&OrganizationalUnit> = units
            .iter()
            .filter(|unit| !visited.contains(&unit.id))
            .collect();
        orphans.sort_by(|left, right| left.name.cmp(&right.name));
        for unit in orphans {
            if let Some(node) = attach(unit, &children, &role_names, &mut visited) {
                nodes.push(node);
            }
        }

        Self {
            unit_count: visited.len(),
            roots: nodes,
        }
    }
}

fn attach<'a>(
    unit: &'a OrganizationalUnit,
    children: &BTreeMap<&'a RecordId, Vec<&'a OrganizationalUnit>>,
    role_names: &BTreeMap<&'a RecordId, Vec<String>>,
    visited: &mut HashSet<&'a RecordId>,
) -> Option<OrgNode> {
    if !visited.insert(&unit.id) {
        return None;
    }

    let mut kids: Vec<&OrganizationalUnit> = children.get(&unit.id).cloned().unwrap_or_default();
    kids.sort_by(|left, right| left.name.cmp(&right.name));

    let children = kids
        .into_iter()
        .filter_map(|child| attach(child, children, role_names, visited))
        .collect();

    Some(OrgNode {
        id: unit.id.clone(),
        name: unit.name.clone(),
        unit_type: unit.unit_type.clone(),
        roles: role_names.get(&unit.id).cloned().unwrap_or_default(),
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str, name: &str, parent: Option<&str>) -> OrganizationalUnit {
        OrganizationalUnit {
            id: RecordId(id.to_string()),
            company_id: CompanyId("acme".to_string()),
            name: name.to_string(),
            unit_type: None,
            parent_id: parent.map(|id| RecordId(id.to_string())),
            manager_id: None,
            description: None,
            status: OrgStatus::Active,
        }
    }

    #[test]
    fn builds_sorted_hierarchy_with_roles() {
        let units = vec![
            unit("u3", "Sales", Some("u1")),
            unit("u1", "Executive Board", None),
            unit("u2", "HR", Some("u1")),
            unit("u4", "Payroll", Some("u2")),
        ];
        let roles = vec![Role {
            id: RecordId("role-000001".to_string()),
            company_id: CompanyId("acme".to_string()),
            name: "Payroll Lead".to_string(),
            description: None,
            unit_id: Some(RecordId("u4".to_string())),
            permissions: vec!["payroll.approve".to_string()],
            status: OrgStatus::Active,
        }];

        let tree = OrgTree::build(&units, &roles);

        assert_eq!(tree.roots.len(), 1);
        assert_eq!(tree.unit_count, 4);
        let board = &tree.roots[0];
        assert_eq!(board.size(), 4);
        let names: Vec<_> = board.children.iter().map(|node| node.name.as_str()).collect();
        assert_eq!(names, vec!["HR", "Sales"]);
        assert_eq!(board.children[0].children[0].roles, vec!["Payroll Lead"]);
    }

    #[test]
    fn unknown_parents_become_roots() {
        let tree = OrgTree::build(&[unit("u1", "Legal", Some("gone"))], &[]);
        assert_eq!(tree.roots.len(), 1);
        assert_eq!(tree.roots[0].name, "Legal");
    }

    #[test]
    fn cycles_are_cut_and_every_unit_appears_once() {
        let units = vec![
            unit("a", "Alpha", Some("b")),
            unit("b", "Beta", Some("a")),
            unit("c", "Gamma", Some("c")),
        ];

        let tree = OrgTree::build(&units, &[]);

        assert_eq!(tree.unit_count, 3);
        let total: usize = tree.roots.iter().map(OrgNode::size).sum();
        assert_eq!(total, 3);
    }
}
