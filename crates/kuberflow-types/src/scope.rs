/// The namespace scope a watch or list operation runs over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceScope {
    /// Watch/list across every namespace in the cluster.
    AllNamespaces,
    /// Watch/list only the namespace the operator process itself runs in.
    CurrentNamespace,
    /// Watch/list a single, explicitly named namespace.
    Named(String),
}
