pub mod driver;
pub mod expectations;
pub mod scene;
pub mod shaders;

pub use driver::{CallLog, DriverCall, FailurePoint, NullDriver, RecordedDraw, RecordingDriver};
pub use expectations::{check_pixels, PixelExpectation};
pub use scene::{quad_row, quad_vertices, SceneResources, CANVAS_HEIGHT, CANVAS_WIDTH};
pub use shaders::TestProgram;
