//! 数据源连接注册与生命周期管理
//!
//! - [`manager`]: 按名称管理连接的注册表
//! - [`connection`] / [`connector`]: 单个连接及其驱动
//! - [`lifecycle`]: 随应用启动/停止连接与关闭
//! - [`container`]: 按键与标签查找的绑定容器
//! - [`application`] / [`booter`]: 宿主应用与连接文件发现
//! - [`routes`] / [`handlers`]: HTTP 管理接口

pub mod application;
pub mod booter;
pub mod connection;
pub mod connector;
pub mod container;
pub mod handlers;
pub mod lifecycle;
pub mod manager;
pub mod routes;
pub mod service;
pub mod state;

pub use application::{Application, ApplicationState};
pub use connection::Connection;
pub use connector::{Connector, DatabasePool, SqlxConnector};
pub use container::{Binding, Container};
pub use lifecycle::{ConnectionLifeCycleManager, LifeCycleObserver};
pub use manager::{ConnectionList, ConnectionManager};
