pub const TOPIC_CONTROLLER_STATE: &str = "microwave/controller/state";
pub const TOPIC_CONTROLLER_STATUS: &str = "microwave/controller/status";

pub const TOPIC_CMD_START: &str = "microwave/cmnd/start";
pub const TOPIC_CMD_PAUSE: &str = "microwave/cmnd/pause";
pub const TOPIC_CMD_RESUME: &str = "microwave/cmnd/resume";
pub const TOPIC_CMD_STOP: &str = "microwave/cmnd/stop";
