//! Circuit element models: capacitor, harvester, converter, and load,
//! plus the shared voltage-threshold registry they all consult.

pub mod capacitor;
pub mod converter;
pub mod harvester;
pub mod load;
pub mod voltage_monitor;

pub use capacitor::{Capacitor, CapacitorEvent, CapacitorModel, IdealCapacitor, TantalumCapacitor};
pub use converter::{
    Bq25570, BuckBoost, BuckConverter, Converter, ConverterModel, Diode, Hysteresis, Ldo,
};
pub use harvester::{Artificial, ArtificialShape, Harvester, HarvesterModel, IvCurve, SolarPanel, SteppedTrace, Teg};
pub use load::{
    AdvancedJitLoad, Application, Atomic, Computation, ConstantLoad, JitLoad, Load, LoadModel,
    LoadSignal, Task, TaskLoad,
};
pub use voltage_monitor::{Edge, VoltageMonitor};
