//! Where body-to-body boolean results land.

use anvil_types::{
    Body, BodyId, BodyOperation, BooleanModifyParams, BooleanOp, BooleanResult, Feature,
    Operation,
};
use tracing::debug;
use uuid::Uuid;

use crate::scene::SceneState;
use crate::types::EngineError;

fn modify(op: BooleanOp, tool: BodyId) -> Operation {
    Operation::BooleanModify {
        params: BooleanModifyParams {
            op,
            tool_body_id: tool,
        },
    }
}

fn modify_feature(op: BooleanOp, tool: BodyId) -> Feature {
    let operation = modify(op, tool);
    Feature::new(operation.label(), operation)
}

impl SceneState {
    /// Combine two bodies and record the combination.
    ///
    /// - `MergeIntoLeft`: the left body gains a `boolean_modify` step with
    ///   the right body as tool, and the right body is hidden.
    /// - `MergeIntoRight`: the same with the roles swapped; the right body
    ///   is the target and the left body the tool.
    /// - `CreateNewBody`: both operands stay as they are and a new body is
    ///   appended that unions the left body and applies `op` with the right.
    ///
    /// Returns the id of the recorded [`BodyOperation`].
    pub fn apply_boolean(
        &mut self,
        left: BodyId,
        right: BodyId,
        op: BooleanOp,
        result: BooleanResult,
    ) -> Result<Uuid, EngineError> {
        if left == right {
            return Err(EngineError::SameBody { id: left });
        }
        self.body(left)?;
        self.body(right)?;
        if let BooleanResult::CreateNewBody { new_body_id, .. } = &result {
            if self.scene().body(*new_body_id).is_some() {
                return Err(EngineError::DuplicateBody { id: *new_body_id });
            }
        }

        self.save_undo();
        let touched = match &result {
            BooleanResult::MergeIntoLeft => self.merge_into(left, right, op),
            BooleanResult::MergeIntoRight => self.merge_into(right, left, op),
            BooleanResult::CreateNewBody {
                new_body_id,
                new_body_name,
            } => {
                let mut body = Body::new(new_body_name.clone());
                body.id = *new_body_id;
                body.features.push(modify_feature(BooleanOp::Union, left));
                body.features.push(modify_feature(op, right));
                self.scene_mut().bodies.push(body);
                vec![*new_body_id]
            }
        };

        let record = BodyOperation {
            id: Uuid::new_v4(),
            op,
            left_body_id: left,
            right_body_id: right,
            result,
        };
        let id = record.id;
        self.scene_mut().body_operations.push(record);
        self.touch(&touched);
        debug!(operation = %id, ?op, %left, %right, "applied boolean");
        Ok(id)
    }

    fn merge_into(&mut self, target: BodyId, tool: BodyId, op: BooleanOp) -> Vec<BodyId> {
        let scene = self.scene_mut();
        let mut appended_at = 0;
        if let Some(body) = scene.body_mut(target) {
            body.features.push(modify_feature(op, tool));
            appended_at = body.features.len() - 1;
        }
        if let Some(body) = scene.body_mut(tool) {
            body.visible = false;
        }
        self.invalidate_from(target, appended_at)
    }
}
