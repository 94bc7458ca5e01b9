use serde::{Deserialize, Serialize};

/// Multiplier for documents in the course the search was made from.
pub const COURSE_BOOST: f64 = 3.0;
/// Multiplier for documents in the exact activity or block context the search was made from.
pub const CONTEXT_BOOST: f64 = 2.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOrder {
	#[default]
	Relevance,
	Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextLevel {
	System,
	User,
	CourseCategory,
	Course,
	Module,
	Block,
}

/// The context a search was issued from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchContext {
	pub context_id: i64,
	pub level: ContextLevel,
	/// Course instance id of the enclosing course context, if any.
	pub course_id: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RankingError {
	LocationWithoutContext,
	LocationOutsideCourse,
}

/// Orders a caller may request from the given context.
pub fn supported_orders(context: Option<&SearchContext>) -> Vec<SearchOrder> {
	let mut orders = vec![SearchOrder::Relevance];

	if context.and_then(|context| context.course_id).is_some() {
		orders.push(SearchOrder::Location);
	}

	orders
}

/// Relevance policy: the best native score across the document and its files, scaled by the
/// location boosts.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RankingCalculator {
	course_boost: Option<i64>,
	context_boost: Option<i64>,
}
impl RankingCalculator {
	pub fn new(
		order: SearchOrder,
		context: Option<&SearchContext>,
	) -> Result<Self, RankingError> {
		match order {
			SearchOrder::Relevance => Ok(Self::default()),
			SearchOrder::Location => {
				let context = context.ok_or(RankingError::LocationWithoutContext)?;
				let course_id = context.course_id.ok_or(RankingError::LocationOutsideCourse)?;
				let context_boost =
					(context.level != ContextLevel::Course).then_some(context.context_id);

				Ok(Self { course_boost: Some(course_id), context_boost })
			},
		}
	}

	/// Course id that earns [`COURSE_BOOST`].
	pub fn course_boost(&self) -> Option<i64> {
		self.course_boost
	}

	/// Context id that earns [`CONTEXT_BOOST`].
	pub fn context_boost(&self) -> Option<i64> {
		self.context_boost
	}

	pub fn boost(&self, courseid: i64, contextid: i64) -> f64 {
		let course = match self.course_boost {
			Some(id) if id == courseid => COURSE_BOOST,
			_ => 1.0,
		};
		let context = match self.context_boost {
			Some(id) if id == contextid => CONTEXT_BOOST,
			_ => 1.0,
		};

		course * context
	}

	pub fn score<I>(&self, doc_score: f64, file_scores: I, courseid: i64, contextid: i64) -> f64
	where
		I: IntoIterator<Item = f64>,
	{
		let best = file_scores.into_iter().fold(doc_score, f64::max);

		best * self.boost(courseid, contextid)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn module_context() -> SearchContext {
		SearchContext { context_id: 77, level: ContextLevel::Module, course_id: Some(5) }
	}

	#[test]
	fn relevance_never_boosts() {
		let calc = RankingCalculator::new(SearchOrder::Relevance, Some(&module_context()))
			.expect("relevance is always valid");

		assert_eq!(calc.boost(5, 77), 1.0);
		assert_eq!(calc.score(0.25, [0.5], 5, 77), 0.5);
	}

	#[test]
	fn matching_course_scores_three_times_higher() {
		let context =
			SearchContext { context_id: 12, level: ContextLevel::Course, course_id: Some(5) };
		let calc = RankingCalculator::new(SearchOrder::Location, Some(&context))
			.expect("course context supports location");
		let inside = calc.score(0.4, Vec::new(), 5, 99);
		let outside = calc.score(0.4, Vec::new(), 6, 99);

		assert_eq!(inside, outside * 3.0);
	}

	#[test]
	fn course_level_context_gets_no_context_boost() {
		let context =
			SearchContext { context_id: 12, level: ContextLevel::Course, course_id: Some(5) };
		let calc = RankingCalculator::new(SearchOrder::Location, Some(&context))
			.expect("course context supports location");

		assert_eq!(calc.context_boost(), None);
		assert_eq!(calc.boost(5, 12), COURSE_BOOST);
	}

	#[test]
	fn boosts_multiply_independently() {
		let calc = RankingCalculator::new(SearchOrder::Location, Some(&module_context()))
			.expect("module context supports location");

		assert_eq!(calc.boost(5, 77), COURSE_BOOST * CONTEXT_BOOST);
		assert_eq!(calc.boost(5, 78), COURSE_BOOST);
		assert_eq!(calc.boost(6, 77), CONTEXT_BOOST);
		assert_eq!(calc.boost(6, 78), 1.0);
	}

	#[test]
	fn best_file_score_wins_over_document_score() {
		let calc = RankingCalculator::default();

		assert_eq!(calc.score(0.1, [0.3, 0.7, 0.2], 1, 1), 0.7);
		assert_eq!(calc.score(0.9, [0.3], 1, 1), 0.9);
	}

	#[test]
	fn location_requires_a_course() {
		let system = SearchContext { context_id: 1, level: ContextLevel::System, course_id: None };

		assert_eq!(
			RankingCalculator::new(SearchOrder::Location, Some(&system)),
			Err(RankingError::LocationOutsideCourse)
		);
		assert_eq!(
			RankingCalculator::new(SearchOrder::Location, None),
			Err(RankingError::LocationWithoutContext)
		);
	}

	#[test]
	fn location_is_offered_only_inside_courses() {
		let system = SearchContext { context_id: 1, level: ContextLevel::System, course_id: None };

		assert_eq!(supported_orders(None), vec![SearchOrder::Relevance]);
		assert_eq!(supported_orders(Some(&system)), vec![SearchOrder::Relevance]);
		assert_eq!(
			supported_orders(Some(&module_context())),
			vec![SearchOrder::Relevance, SearchOrder::Location]
		);
	}

	#[test]
	fn order_deserializes_from_snake_case() {
		let order: SearchOrder = serde_json::from_str("\"location\"").expect("valid order");

		assert_eq!(order, SearchOrder::Location);
	}
}
