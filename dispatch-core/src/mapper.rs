//! 键派生（Mapper）
//!
//! 将命令载荷派生为两类附属记录：锁键（LockKey）与行为模型（BehaviorModel）。
//! - 锁键派生按（载荷类型, 目标服务）对注册：同一载荷面向不同服务得到不同锁键；
//! - 行为模型派生按载荷类型注册，供日志行为展示；
//! - 派生函数为纯函数，每次分发重新计算，结果不缓存不持久化。
//!
use crate::command::{AnyCommand, MessageBody};
use crate::error::{DispatchError, DispatchResult};
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 目标服务标识（ServiceIdentity）
///
/// 稳定的服务名（常量字符串），锁键派生注册表键的一半。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ServiceIdentity(&'static str);

impl ServiceIdentity {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// 锁键（LockKey）
///
/// 按载荷与目标服务派生的关联/唯一性记录，仅在一次分发内有效。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockKey {
    name: String,
}

impl LockKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_name(self) -> String {
        self.name
    }
}

/// 行为模型（BehaviorModel）：命令的日志/审计展示形式
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorModel {
    name: String,
}

impl BehaviorModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_name(self) -> String {
        self.name
    }
}

type LockKeyFn = Arc<dyn Fn(&dyn Any) -> DispatchResult<LockKey> + Send + Sync>;

type BehaviorModelFn = Arc<dyn Fn(&dyn Any) -> DispatchResult<BehaviorModel> + Send + Sync>;

/// 键派生注册表（MapperRegistry）
/// - 通过 TypeId 注册不同载荷对应的派生函数（重复注册立即报错）
/// - 注册使用 `&mut self`；完成后以 `Arc` 冻结共享，只读并发安全
pub struct MapperRegistry {
    lock_keys: HashMap<(TypeId, ServiceIdentity), LockKeyFn>,
    behavior_models: HashMap<TypeId, BehaviorModelFn>,
}

impl Default for MapperRegistry {
    fn default() -> Self {
        Self {
            lock_keys: HashMap::new(),
            behavior_models: HashMap::new(),
        }
    }
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册锁键派生：`body.name()` 拼接固定后缀
    pub fn register_lock_key<B>(
        &mut self,
        target: ServiceIdentity,
        suffix: impl Into<String>,
    ) -> DispatchResult<()>
    where
        B: MessageBody,
    {
        let suffix = suffix.into();

        self.register_lock_key_with::<B>(target, move |body| {
            LockKey::new(format!("{}{}", body.name(), suffix))
        })
    }

    /// 注册锁键派生：显式纯函数形式
    pub fn register_lock_key_with<B>(
        &mut self,
        target: ServiceIdentity,
        derive: impl Fn(&B) -> LockKey + Send + Sync + 'static,
    ) -> DispatchResult<()>
    where
        B: MessageBody,
    {
        let key = (TypeId::of::<B>(), target);

        if self.lock_keys.contains_key(&key) {
            return Err(DispatchError::AlreadyMapped {
                payload: B::NAME,
                target: Some(target.name()),
            });
        }

        let f: LockKeyFn = Arc::new(move |payload| {
            let Some(body) = payload.downcast_ref::<B>() else {
                return Err(DispatchError::TypeMismatch {
                    expected: B::NAME,
                    found: "unknown",
                });
            };

            Ok(derive(body))
        });

        self.lock_keys.insert(key, f);

        Ok(())
    }

    /// 注册行为模型派生：`body.name()` 拼接固定后缀
    pub fn register_behavior_model<B>(&mut self, suffix: impl Into<String>) -> DispatchResult<()>
    where
        B: MessageBody,
    {
        let suffix = suffix.into();

        self.register_behavior_model_with::<B>(move |body| {
            BehaviorModel::new(format!("{}{}", body.name(), suffix))
        })
    }

    /// 注册行为模型派生：显式纯函数形式
    pub fn register_behavior_model_with<B>(
        &mut self,
        derive: impl Fn(&B) -> BehaviorModel + Send + Sync + 'static,
    ) -> DispatchResult<()>
    where
        B: MessageBody,
    {
        let key = TypeId::of::<B>();

        if self.behavior_models.contains_key(&key) {
            return Err(DispatchError::AlreadyMapped {
                payload: B::NAME,
                target: None,
            });
        }

        let f: BehaviorModelFn = Arc::new(move |payload| {
            let Some(body) = payload.downcast_ref::<B>() else {
                return Err(DispatchError::TypeMismatch {
                    expected: B::NAME,
                    found: "unknown",
                });
            };

            Ok(derive(body))
        });

        self.behavior_models.insert(key, f);

        Ok(())
    }

    /// 派生锁键：按（载荷类型, 目标服务）对查找
    pub fn lock_key(
        &self,
        cmd: &dyn AnyCommand,
        target: ServiceIdentity,
    ) -> DispatchResult<LockKey> {
        let Some(f) = self.lock_keys.get(&(cmd.payload_type(), target)) else {
            return Err(DispatchError::UnmappedType {
                payload: cmd.command_name(),
                target: Some(target.name()),
            });
        };

        (f)(cmd.payload_any())
    }

    /// 派生行为模型：按载荷类型查找
    pub fn behavior_model(&self, cmd: &dyn AnyCommand) -> DispatchResult<BehaviorModel> {
        let Some(f) = self.behavior_models.get(&cmd.payload_type()) else {
            return Err(DispatchError::UnmappedType {
                payload: cmd.command_name(),
                target: None,
            });
        };

        (f)(cmd.payload_any())
    }
}
