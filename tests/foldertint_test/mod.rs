pub mod project_util;
