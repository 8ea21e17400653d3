//! Operator trees over matrix leaves.

use std::fmt;

/// The kind of a [`ComputationNode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A leaf holding concrete data.
    Matrix,
    /// Element-wise sum of two or more operands.
    Add,
    /// Matrix product of two or more operands.
    Multiply,
    /// Element-wise negation of one operand.
    Negate,
    /// Transpose of one operand.
    Transpose,
}

impl NodeKind {
    /// Parses a script operator symbol: `+`, `*`, `-` or `T`.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(NodeKind::Add),
            "*" => Some(NodeKind::Multiply),
            "-" => Some(NodeKind::Negate),
            "T" => Some(NodeKind::Transpose),
            _ => None,
        }
    }

    /// Returns the script symbol, or `None` for [`NodeKind::Matrix`].
    #[must_use]
    pub fn symbol(self) -> Option<&'static str> {
        match self {
            NodeKind::Matrix => None,
            NodeKind::Add => Some("+"),
            NodeKind::Multiply => Some("*"),
            NodeKind::Negate => Some("-"),
            NodeKind::Transpose => Some("T"),
        }
    }

    /// Returns true for operators that may be regrouped: `Add` and `Multiply`.
    #[must_use]
    pub fn is_associative(self) -> bool {
        matches!(self, NodeKind::Add | NodeKind::Multiply)
    }

    /// Returns true for operators applied to a single operand.
    #[must_use]
    pub fn is_unary(self) -> bool {
        matches!(self, NodeKind::Negate | NodeKind::Transpose)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Matrix => "matrix",
            NodeKind::Add => "add",
            NodeKind::Multiply => "multiply",
            NodeKind::Negate => "negate",
            NodeKind::Transpose => "transpose",
        };
        f.write_str(name)
    }
}

/// A node of the operator tree.
///
/// Leaves are [`NodeKind::Matrix`] nodes with data and no children. Internal
/// nodes hold an operator and an ordered list of operands; the engine turns
/// them into leaves with [`ComputationNode::resolve`].
#[derive(Clone, Debug, PartialEq)]
pub struct ComputationNode {
    kind: NodeKind,
    children: Vec<ComputationNode>,
    matrix: Option<Vec<Vec<f64>>>,
}

impl ComputationNode {
    /// Creates a matrix leaf.
    #[must_use]
    pub fn leaf(rows: Vec<Vec<f64>>) -> Self {
        Self {
            kind: NodeKind::Matrix,
            children: Vec::new(),
            matrix: Some(rows),
        }
    }

    /// Creates an operator node.
    #[must_use]
    pub fn operator(kind: NodeKind, children: Vec<ComputationNode>) -> Self {
        Self {
            kind,
            children,
            matrix: None,
        }
    }

    /// Returns the node kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns the operands, empty for a leaf.
    #[must_use]
    pub fn children(&self) -> &[ComputationNode] {
        &self.children
    }

    /// Returns the leaf data, if any.
    #[must_use]
    pub fn matrix(&self) -> Option<&[Vec<f64>]> {
        self.matrix.as_deref()
    }

    /// Consumes the node and returns its leaf data, if any.
    #[must_use]
    pub fn into_matrix(self) -> Option<Vec<Vec<f64>>> {
        self.matrix
    }

    /// Returns true for [`NodeKind::Matrix`] nodes.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Matrix
    }

    /// Turns this node into a matrix leaf holding `rows`, dropping its children.
    pub fn resolve(&mut self, rows: Vec<Vec<f64>>) {
        self.kind = NodeKind::Matrix;
        self.children.clear();
        self.matrix = Some(rows);
    }

    /// Rewrites n-ary `Add` and `Multiply` nodes into left-nested binary chains.
    ///
    /// `Add(a, b, c)` becomes `Add(Add(a, b), c)`. Unary and binary nodes are
    /// unchanged.
    pub fn normalize_associativity(&mut self) {
        for child in &mut self.children {
            child.normalize_associativity();
        }
        if !self.kind.is_associative() {
            return;
        }
        while self.children.len() > 2 {
            let pair: Vec<ComputationNode> = self.children.drain(..2).collect();
            self.children
                .insert(0, ComputationNode::operator(self.kind, pair));
        }
    }

    /// Returns the leftmost internal node whose operands are all leaves.
    ///
    /// Resolving the returned node and calling this again visits the tree in
    /// post-order. Returns `None` if this node is itself a leaf.
    pub fn find_resolvable(&mut self) -> Option<&mut ComputationNode> {
        if self.is_leaf() {
            return None;
        }
        let mut node = self;
        loop {
            match node.children.iter().position(|c| !c.is_leaf()) {
                Some(i) => node = &mut node.children[i],
                None => return Some(node),
            }
        }
    }

    /// Returns the number of levels below and including this node.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1_usize)];
        while let Some((node, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(node.children.iter().map(|c| (c, level + 1)));
        }
        deepest
    }

    /// Returns the number of operator nodes in the tree.
    #[must_use]
    pub fn operator_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if !node.is_leaf() {
                count += 1;
            }
            stack.extend(node.children.iter());
        }
        count
    }

    /// Replaces the first two operands with a leaf holding `rows`.
    pub(crate) fn fold_front(&mut self, rows: Vec<Vec<f64>>) {
        self.children.drain(..2.min(self.children.len()));
        self.children.insert(0, ComputationNode::leaf(rows));
    }
}
