use crate::domain::model::{CompletedCourse, Course, Exception, PlanningContext, TermPlan};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Opaque handle to an element of a rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Read-only view over a rendered agreement's element hierarchy.
///
/// The parser only walks children and reads text/attributes, so any DOM,
/// snapshot or fixture can sit behind this trait.
pub trait DocumentTree {
    fn root(&self) -> NodeId;

    /// Direct children in document order.
    fn children_of(&self, node: NodeId) -> Vec<NodeId>;

    /// Whitespace-normalized text of the node and all of its descendants.
    fn text_of(&self, node: NodeId) -> String;

    fn attr_of(&self, node: NodeId, name: &str) -> Option<String>;

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr_of(node, "class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

/// Everything a generator may use to propose a term schedule.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub context: &'a PlanningContext,
    pub available: &'a [Course],
    pub exceptions: &'a [Exception],
    pub completed: &'a [CompletedCourse],
}

/// An alternative, usually model-backed, way to build a [`TermPlan`].
#[async_trait]
pub trait ScheduleGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: GenerationRequest<'_>) -> Result<TermPlan>;
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
