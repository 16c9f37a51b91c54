//! The `valid_policy_tree` of RFC 5280 Section 6.1.2(a).
//!
//! Nodes live in one arena `Vec` and refer to each other by index;
//! deletion is logical, so indices stay stable while the tree is pruned
//! between certificates.

use der::asn1::ObjectIdentifier;

use crate::ext::policy::{CertificatePolicies, PolicyMappings, PolicyQualifierInfo};
use crate::oid;

/// One node of the policy tree.
#[derive(Clone, Debug)]
pub struct PolicyNode {
    /// The policy this node represents in the current certificate.
    pub valid_policy: ObjectIdentifier,

    /// Qualifiers attached to `valid_policy` by the certificate.
    pub qualifiers: Vec<PolicyQualifierInfo>,

    /// Policies that would satisfy this node in the next certificate.
    pub expected_policy_set: Vec<ObjectIdentifier>,

    parent: Option<usize>,
    children: Vec<usize>,
    depth: usize,
    deleted: bool,
}

/// The policy tree; starts as a single `anyPolicy` root at depth zero.
#[derive(Clone, Debug)]
pub struct PolicyTree {
    nodes: Vec<PolicyNode>,
}

impl Default for PolicyTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![PolicyNode {
                valid_policy: oid::ANY_POLICY,
                qualifiers: Vec::new(),
                expected_policy_set: vec![oid::ANY_POLICY],
                parent: None,
                children: Vec::new(),
                depth: 0,
                deleted: false,
            }],
        }
    }

    /// The whole tree is gone once the root has been deleted.
    pub fn is_empty(&self) -> bool {
        self.nodes[0].deleted
    }

    /// Valid policies of the live nodes at `depth`, deduplicated.
    pub fn policies_at_depth(&self, depth: usize) -> Vec<ObjectIdentifier> {
        let mut policies = Vec::new();
        for idx in self.live_at_depth(depth) {
            let policy = self.nodes[idx].valid_policy;
            if !policies.contains(&policy) {
                policies.push(policy);
            }
        }
        policies
    }

    /// Live nodes at `depth`, for result inspection.
    pub fn nodes_at_depth(&self, depth: usize) -> Vec<&PolicyNode> {
        self.live_at_depth(depth)
            .into_iter()
            .map(|idx| &self.nodes[idx])
            .collect()
    }

    fn live_at_depth(&self, depth: usize) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&idx| !self.nodes[idx].deleted && self.nodes[idx].depth == depth)
            .collect()
    }

    fn add_child(
        &mut self,
        parent: usize,
        valid_policy: ObjectIdentifier,
        qualifiers: Vec<PolicyQualifierInfo>,
        expected_policy_set: Vec<ObjectIdentifier>,
    ) -> usize {
        let idx = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(PolicyNode {
            valid_policy,
            qualifiers,
            expected_policy_set,
            parent: Some(parent),
            children: Vec::new(),
            depth,
            deleted: false,
        });
        self.nodes[parent].children.push(idx);
        idx
    }

    fn delete_subtree(&mut self, idx: usize) {
        self.nodes[idx].deleted = true;
        let children = self.nodes[idx].children.clone();
        for child in children {
            self.delete_subtree(child);
        }
    }

    fn live_child_count(&self, idx: usize) -> usize {
        self.nodes[idx]
            .children
            .iter()
            .filter(|&&c| !self.nodes[c].deleted)
            .count()
    }

    /// Deletes nodes of depth less than `depth` that have no live
    /// children (RFC 5280 Section 6.1.3(d)(3)).
    pub(crate) fn prune(&mut self, depth: usize) {
        for d in (0..depth).rev() {
            for idx in self.live_at_depth(d) {
                if self.live_child_count(idx) == 0 {
                    self.nodes[idx].deleted = true;
                }
            }
        }
    }

    /// Grows the tree by one certificate's policies
    /// (RFC 5280 Section 6.1.3(d)(1) and (d)(2)).
    ///
    /// `any_policy_allowed` gates the special `anyPolicy` expansion.
    /// The caller prunes afterwards.
    pub(crate) fn process_policies(
        &mut self,
        policies: &CertificatePolicies,
        depth: usize,
        any_policy_allowed: bool,
    ) {
        let parents = self.live_at_depth(depth - 1);

        for info in policies.iter() {
            if info.policy_identifier == oid::ANY_POLICY {
                continue;
            }
            let policy = info.policy_identifier;
            let qualifiers = info.policy_qualifiers.clone().unwrap_or_default();

            let mut matched = false;
            for &parent in &parents {
                if self.nodes[parent].expected_policy_set.contains(&policy) {
                    self.add_child(parent, policy, qualifiers.clone(), vec![policy]);
                    matched = true;
                }
            }
            if !matched {
                if let Some(&any_parent) = parents
                    .iter()
                    .find(|&&p| self.nodes[p].valid_policy == oid::ANY_POLICY)
                {
                    self.add_child(any_parent, policy, qualifiers, vec![policy]);
                }
            }
        }

        if let Some(any_info) = policies
            .iter()
            .find(|info| info.policy_identifier == oid::ANY_POLICY)
        {
            if any_policy_allowed {
                let qualifiers = any_info.policy_qualifiers.clone().unwrap_or_default();
                for &parent in &parents {
                    let expected = self.nodes[parent].expected_policy_set.clone();
                    for policy in expected {
                        let already = self.nodes[parent]
                            .children
                            .iter()
                            .any(|&c| !self.nodes[c].deleted && self.nodes[c].valid_policy == policy);
                        if !already {
                            self.add_child(parent, policy, qualifiers.clone(), vec![policy]);
                        }
                    }
                }
            }
        }
    }

    /// Applies a certificate's policy mappings to the nodes at `depth`
    /// (RFC 5280 Section 6.1.4(b)).
    ///
    /// With mapping inhibited, mapped policies are deleted instead.
    /// The caller prunes afterwards.
    pub(crate) fn map_policies(
        &mut self,
        mappings: &PolicyMappings,
        depth: usize,
        mapping_allowed: bool,
    ) {
        // group subject domains by issuer domain
        let mut grouped: Vec<(ObjectIdentifier, Vec<ObjectIdentifier>)> = Vec::new();
        for mapping in mappings.iter() {
            match grouped
                .iter_mut()
                .find(|(idp, _)| *idp == mapping.issuer_domain_policy)
            {
                Some((_, subjects)) => subjects.push(mapping.subject_domain_policy),
                None => grouped.push((
                    mapping.issuer_domain_policy,
                    vec![mapping.subject_domain_policy],
                )),
            }
        }

        for (issuer_policy, subject_policies) in grouped {
            if mapping_allowed {
                let mut found = false;
                for idx in self.live_at_depth(depth) {
                    if self.nodes[idx].valid_policy == issuer_policy {
                        self.nodes[idx].expected_policy_set = subject_policies.clone();
                        found = true;
                    }
                }
                if !found {
                    // an anyPolicy node at this depth stands in for the
                    // unmentioned issuer policy
                    if let Some(any_idx) = self
                        .live_at_depth(depth)
                        .into_iter()
                        .find(|&idx| self.nodes[idx].valid_policy == oid::ANY_POLICY)
                    {
                        let qualifiers = self.nodes[any_idx].qualifiers.clone();
                        if let Some(parent) = self.nodes[any_idx].parent {
                            self.add_child(parent, issuer_policy, qualifiers, subject_policies);
                        }
                    }
                }
            } else {
                for idx in self.live_at_depth(depth) {
                    if self.nodes[idx].valid_policy == issuer_policy {
                        self.delete_subtree(idx);
                    }
                }
            }
        }
    }

    /// Intersects the tree with the caller's acceptable policy set
    /// (RFC 5280 Section 6.1.5(g)(iii)). `depth` is the tree's final
    /// depth. The caller checks for emptiness afterwards.
    pub(crate) fn intersect_with_user_set(
        &mut self,
        depth: usize,
        user_set: &[ObjectIdentifier],
    ) {
        // nodes whose parent is anyPolicy-valued
        let valid_policy_node_set: Vec<usize> = (0..self.nodes.len())
            .filter(|&idx| {
                !self.nodes[idx].deleted
                    && self.nodes[idx]
                        .parent
                        .is_some_and(|p| self.nodes[p].valid_policy == oid::ANY_POLICY)
            })
            .collect();

        for &idx in &valid_policy_node_set {
            let policy = self.nodes[idx].valid_policy;
            if policy != oid::ANY_POLICY && !user_set.contains(&policy) {
                self.delete_subtree(idx);
            }
        }

        if let Some(any_leaf) = self
            .live_at_depth(depth)
            .into_iter()
            .find(|&idx| self.nodes[idx].valid_policy == oid::ANY_POLICY)
        {
            let qualifiers = self.nodes[any_leaf].qualifiers.clone();
            let parent = self.nodes[any_leaf].parent;
            let present: Vec<ObjectIdentifier> = valid_policy_node_set
                .iter()
                .filter(|&&idx| !self.nodes[idx].deleted)
                .map(|&idx| self.nodes[idx].valid_policy)
                .collect();
            if let Some(parent) = parent {
                for &policy in user_set {
                    if !present.contains(&policy) {
                        self.add_child(parent, policy, qualifiers.clone(), vec![policy]);
                    }
                }
            }
            self.nodes[any_leaf].deleted = true;
        }

        self.prune(depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext::policy::PolicyInformation;

    const POLICY_A: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.99999.1");
    const POLICY_B: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.99999.2");

    fn policies(ids: &[ObjectIdentifier]) -> CertificatePolicies {
        CertificatePolicies(ids.iter().copied().map(PolicyInformation::new).collect())
    }

    #[test]
    fn specific_policy_chains_through_any_policy() {
        let mut tree = PolicyTree::new();
        tree.process_policies(&policies(&[oid::ANY_POLICY]), 1, true);
        tree.prune(1);
        tree.process_policies(&policies(&[POLICY_A]), 2, false);
        tree.prune(2);
        assert!(!tree.is_empty());
        assert_eq!(tree.policies_at_depth(2), vec![POLICY_A]);
    }

    #[test]
    fn unmatched_policy_empties_the_tree() {
        let mut tree = PolicyTree::new();
        tree.process_policies(&policies(&[POLICY_A]), 1, true);
        tree.prune(1);
        tree.process_policies(&policies(&[POLICY_B]), 2, false);
        tree.prune(2);
        assert!(tree.is_empty());
    }

    #[test]
    fn mapping_rewrites_expected_policies() {
        let mut tree = PolicyTree::new();
        tree.process_policies(&policies(&[POLICY_A]), 1, true);
        tree.prune(1);
        tree.map_policies(
            &PolicyMappings(vec![crate::ext::policy::PolicyMapping {
                issuer_domain_policy: POLICY_A,
                subject_domain_policy: POLICY_B,
            }]),
            1,
            true,
        );
        tree.process_policies(&policies(&[POLICY_B]), 2, false);
        tree.prune(2);
        assert_eq!(tree.policies_at_depth(2), vec![POLICY_B]);
    }

    #[test]
    fn inhibited_mapping_deletes_the_mapped_node() {
        let mut tree = PolicyTree::new();
        tree.process_policies(&policies(&[POLICY_A]), 1, true);
        tree.prune(1);
        tree.map_policies(
            &PolicyMappings(vec![crate::ext::policy::PolicyMapping {
                issuer_domain_policy: POLICY_A,
                subject_domain_policy: POLICY_B,
            }]),
            1,
            false,
        );
        tree.prune(1);
        assert!(tree.is_empty());
    }

    #[test]
    fn user_set_intersection_keeps_matching_policies() {
        let mut tree = PolicyTree::new();
        tree.process_policies(&policies(&[POLICY_A, POLICY_B]), 1, true);
        tree.prune(1);
        tree.intersect_with_user_set(1, &[POLICY_A]);
        assert_eq!(tree.policies_at_depth(1), vec![POLICY_A]);

        let mut tree = PolicyTree::new();
        tree.process_policies(&policies(&[POLICY_B]), 1, true);
        tree.prune(1);
        tree.intersect_with_user_set(1, &[POLICY_A]);
        assert!(tree.is_empty());
    }

    #[test]
    fn any_policy_leaf_expands_to_the_user_set() {
        let mut tree = PolicyTree::new();
        tree.process_policies(&policies(&[oid::ANY_POLICY]), 1, true);
        tree.prune(1);
        tree.intersect_with_user_set(1, &[POLICY_A, POLICY_B]);
        let mut got = tree.policies_at_depth(1);
        got.sort();
        assert_eq!(got, vec![POLICY_A, POLICY_B]);
    }
}
